use rand::rngs::StdRng;
use rand::SeedableRng;
use riichi_engine::{
    CallKind, Claim, Meld, Phase, SharedTable, TableError, TableUpdate, Tile, Wall, SEATS,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

fn table_with_seed(seed: u64) -> SharedTable {
    let mut rng = StdRng::seed_from_u64(seed);
    SharedTable::new(Wall::shuffled(&mut rng))
}

fn seat_everyone(table: &SharedTable) {
    for expected in 0..SEATS {
        let (index, rx) = table.join().unwrap();
        assert_eq!(index, expected);
        // 不消费广播，丢弃接收端
        drop(rx);
    }
}

/// 全桌 136 张牌在手牌、摸牌、副露、牌河与牌山之间守恒
fn assert_tile_conservation(update: &TableUpdate) {
    let mut total = update.wall_remaining + Wall::DEAD_WALL;
    for seat in &update.seats {
        total += seat.hand.len() + usize::from(seat.drawn.is_some()) + seat.discards.len();
        for meld in &seat.melds {
            total += match meld {
                Meld::Run { .. } | Meld::Triplet { .. } => 3,
                Meld::Quad { .. } => 4,
            };
        }
    }
    assert_eq!(total, Tile::TOTAL_COUNT);
}

/// 测试完整对局：全员只摸只打，跑到荒牌流局
#[test]
fn test_full_session_to_exhaustive_draw() {
    let table = table_with_seed(42);
    let outcome = Arc::new(AtomicI64::new(-2));
    {
        let outcome = Arc::clone(&outcome);
        table.on_finish(move |winner| {
            outcome.store(winner.map_or(-1, |w| w as i64), Ordering::SeqCst);
        });
    }
    seat_everyone(&table);

    for _ in 0..4000 {
        let view = table.snapshot();
        assert_tile_conservation(&view);
        match view.phase {
            Phase::AwaitingDraw => {
                table.draw(view.turn).unwrap();
            }
            Phase::AwaitingDiscard => {
                let seat = &view.seats[view.turn];
                let tile = seat
                    .drawn
                    .or_else(|| seat.hand.first().copied())
                    .expect("seat must hold a tile to discard");
                table.discard(view.turn, tile).unwrap();
            }
            Phase::ResponseWindow => {
                // 全员放弃响应
                let (seat, _) = view.window[0].clone();
                table.cancel_action(seat).unwrap();
            }
            Phase::Terminal => break,
        }
    }

    let end = table.snapshot();
    assert_eq!(end.phase, Phase::Terminal);
    assert_eq!(end.winner, None);
    assert_eq!(end.wall_remaining, 0);
    assert_eq!(outcome.load(Ordering::SeqCst), -1);
    assert_tile_conservation(&end);
}

/// 测试响应窗口：吃的资格只会给打牌者的下家
#[test]
fn test_chii_only_offered_to_next_seat() {
    let table = table_with_seed(7);
    seat_everyone(&table);

    let mut chii_offers = 0;
    for _ in 0..4000 {
        let view = table.snapshot();
        match view.phase {
            Phase::AwaitingDraw => {
                table.draw(view.turn).unwrap();
            }
            Phase::AwaitingDiscard => {
                let discarder = view.turn;
                let seat = &view.seats[discarder];
                let tile = seat
                    .drawn
                    .or_else(|| seat.hand.first().copied())
                    .expect("seat must hold a tile to discard");
                table.discard(discarder, tile).unwrap();

                let after = table.snapshot();
                for (responder, calls) in &after.window {
                    if calls.contains(&CallKind::Chii) {
                        assert_eq!(*responder, (discarder + 1) % SEATS);
                        chii_offers += 1;
                    }
                }
            }
            Phase::ResponseWindow => {
                let (seat, _) = view.window[0].clone();
                table.cancel_action(seat).unwrap();
            }
            Phase::Terminal => break,
        }
    }
    // 一整局里下家总该有机会吃到
    assert!(chii_offers > 0);
}

/// 测试碰成立后夺取回合并把弃牌并入副露
#[test]
fn test_pon_seizes_turn() {
    let table = table_with_seed(11);
    seat_everyone(&table);

    let mut pon_seen = false;
    for _ in 0..4000 {
        let view = table.snapshot();
        assert_tile_conservation(&view);
        match view.phase {
            Phase::AwaitingDraw => {
                table.draw(view.turn).unwrap();
            }
            Phase::AwaitingDiscard => {
                let seat = &view.seats[view.turn];
                let tile = seat
                    .drawn
                    .or_else(|| seat.hand.first().copied())
                    .expect("seat must hold a tile to discard");
                table.discard(view.turn, tile).unwrap();
            }
            Phase::ResponseWindow => {
                let (seat, calls) = view.window[0].clone();
                let melds_before = table.snapshot().seats[seat].melds.len();
                if calls.contains(&CallKind::Pon) {
                    table.take_action(seat, Claim::Pon).unwrap();
                    let after = table.snapshot();
                    // 更高优先级者仍未表态时宣言暂挂
                    if after.phase == Phase::AwaitingDiscard {
                        assert_eq!(after.turn, seat);
                        assert_eq!(after.seats[seat].melds.len(), melds_before + 1);
                        assert_eq!(after.last_discard, None);
                        pon_seen = true;
                    }
                } else {
                    table.cancel_action(seat).unwrap();
                }
            }
            Phase::Terminal => break,
        }
    }
    assert!(pon_seen);
    assert_eq!(table.snapshot().phase, Phase::Terminal);
}

/// 测试对局中途离座：通道关闭、会话终止
#[test]
fn test_leave_mid_session() {
    let table = table_with_seed(3);
    let mut receivers = Vec::new();
    for _ in 0..SEATS {
        let (_, rx) = table.join().unwrap();
        receivers.push(rx);
    }

    table.draw(0).unwrap();
    table.leave(0).unwrap();

    assert_eq!(table.snapshot().phase, Phase::Terminal);
    assert_eq!(table.draw(1).unwrap_err(), TableError::GameOver);
    assert_eq!(table.leave(9).unwrap_err(), TableError::InvalidSeat(9));

    // 发送端全部丢弃：排空缓冲后接收端断开
    for rx in receivers {
        while rx.recv().is_ok() {}
    }
}

/// 测试同一种子两局牌序一致
#[test]
fn test_seeded_sessions_are_reproducible() {
    let run = |seed: u64| -> Vec<Option<Tile>> {
        let table = table_with_seed(seed);
        seat_everyone(&table);
        let mut draws = Vec::new();
        for _ in 0..40 {
            let view = table.snapshot();
            match view.phase {
                Phase::AwaitingDraw => draws.push(table.draw(view.turn).unwrap()),
                Phase::AwaitingDiscard => {
                    let seat = &view.seats[view.turn];
                    let tile = seat.drawn.expect("just drew");
                    table.discard(view.turn, tile).unwrap();
                }
                Phase::ResponseWindow => {
                    let (seat, _) = view.window[0].clone();
                    table.cancel_action(seat).unwrap();
                }
                Phase::Terminal => break,
            }
        }
        draws
    };

    assert_eq!(run(42), run(42));
    assert_ne!(run(42), run(43));
}
