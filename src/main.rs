/// 可执行文件入口（用于测试和调试）
///
/// 用固定策略的四个机器人打满一整局：能和则和，能碰则碰，
/// 其余一律打出摸到的牌。种子可由第一个命令行参数指定。

use rand::rngs::StdRng;
use rand::SeedableRng;
use riichi_engine::{CallKind, Claim, Hand, Phase, SharedTable, Wall, WinChecker, SEATS};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let seed: u64 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(9);
    println!("立直麻将对局引擎演示（种子 {}）", seed);

    let mut rng = StdRng::seed_from_u64(seed);
    let table = SharedTable::new(Wall::shuffled(&mut rng));
    table.on_finish(|winner| match winner {
        Some(seat) => println!("对局结束：座位 {} 和牌", seat),
        None => println!("对局结束：流局"),
    });

    for _ in 0..SEATS {
        let (index, _rx) = table.join()?;
        println!("座位 {} 入座", index);
    }

    let mut checker = WinChecker::new();
    loop {
        let view = table.snapshot();
        match view.phase {
            Phase::AwaitingDraw => {
                table.draw(view.turn)?;
            }
            Phase::AwaitingDiscard => {
                let seat = &view.seats[view.turn];
                let mut hand = Hand::new();
                for &tile in &seat.hand {
                    hand.add(tile)?;
                }
                if checker.is_win(&hand, seat.drawn) {
                    table.declare_win(view.turn)?;
                    continue;
                }
                // 副露夺取回合后没有摸牌，此时打手牌第一张
                let tile = match seat.drawn.or_else(|| seat.hand.first().copied()) {
                    Some(t) => t,
                    None => break,
                };
                table.discard(view.turn, tile)?;
            }
            Phase::ResponseWindow => {
                let (seat, calls) = view.window[0].clone();
                if calls.contains(&CallKind::Ron) {
                    table.declare_win(seat)?;
                } else if calls.contains(&CallKind::Pon) {
                    table.take_action(seat, Claim::Pon)?;
                } else {
                    table.cancel_action(seat)?;
                }
            }
            Phase::Terminal => break,
        }
    }

    let end = table.snapshot();
    println!("终局：山牌剩余 {} 张", end.wall_remaining);
    for (i, seat) in end.seats.iter().enumerate() {
        let hand: Vec<String> = seat.hand.iter().map(|t| t.to_string()).collect();
        println!(
            "座位 {}：手牌 [{}]，副露 {} 组，牌河 {} 张",
            i,
            hand.join(" "),
            seat.melds.len(),
            seat.discards.len()
        );
    }
    Ok(())
}
