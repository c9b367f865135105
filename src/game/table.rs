use crate::game::meld::Meld;
use crate::game::seat::{CallKind, Seat, SeatError};
use crate::tile::{Tile, Wall, WallError};
use log::{debug, info};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use thiserror::Error;

/// 牌桌错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    /// 四个座位已满
    #[error("table already has four seats")]
    TableFull,
    /// 人数未满，对局尚未开始
    #[error("waiting for players")]
    NotStarted,
    /// 座位号不存在
    #[error("no such seat: {0}")]
    InvalidSeat(usize),
    /// 不是该座位的回合
    #[error("not seat {0}'s turn")]
    NotYourTurn(usize),
    /// 当前阶段不允许该动作
    #[error("action not allowed in the current phase")]
    WrongPhase,
    /// 该座位不在响应窗口中（或已表过态）
    #[error("seat {0} has no pending response")]
    NotInWindow(usize),
    /// 该座位没有做此种响应的资格
    #[error("seat {0} may not make that call")]
    IneligibleCall(usize),
    /// 没有等待响应的弃牌
    #[error("no discard is waiting for responses")]
    NoPendingDiscard,
    /// 和牌宣言未通过验证
    #[error("winning declaration does not verify")]
    NotWinning,
    /// 对局已结束
    #[error("the session has ended")]
    GameOver,
    #[error(transparent)]
    Seat(#[from] SeatError),
    #[error(transparent)]
    Wall(#[from] WallError),
}

/// 牌桌阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Phase {
    /// 等待当前座位摸牌
    AwaitingDraw,
    /// 等待当前座位打牌
    AwaitingDiscard,
    /// 弃牌响应窗口开启中
    ResponseWindow,
    /// 对局结束
    Terminal,
}

/// 对他家弃牌的响应宣言
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Claim {
    /// 吃，并指定手中的两张搭子
    Chii { partners: [Tile; 2] },
    /// 碰
    Pon,
    /// 明杠
    Kan,
    /// 荣和
    Ron,
}

impl Claim {
    pub fn kind(&self) -> CallKind {
        match self {
            Claim::Chii { .. } => CallKind::Chii,
            Claim::Pon => CallKind::Pon,
            Claim::Kan => CallKind::Kan,
            Claim::Ron => CallKind::Ron,
        }
    }
}

/// 响应窗口里的一名待表态者
#[derive(Debug, Clone)]
struct Responder {
    seat: usize,
    calls: Vec<CallKind>,
    decided: bool,
}

impl Responder {
    /// 该座位可做响应中的最高优先级
    fn max_priority(&self) -> u8 {
        self.calls.iter().map(CallKind::priority).max().unwrap_or(0)
    }
}

/// 暂挂的低优先级宣言（等更高优先级者表态后再执行）
#[derive(Debug, Clone, Copy)]
struct DeferredClaim {
    seat: usize,
    claim: Claim,
}

/// 单个座位的快照
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SeatView {
    /// 手牌（理牌顺序）
    pub hand: Vec<Tile>,
    /// 摸牌
    pub drawn: Option<Tile>,
    /// 副露区
    pub melds: Vec<Meld>,
    /// 牌河
    pub discards: Vec<Tile>,
    /// 是否立直
    pub riichi: bool,
}

/// 广播给各座位的牌桌快照
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TableUpdate {
    /// 各座位状态
    pub seats: Vec<SeatView>,
    /// 当前回合座位
    pub turn: usize,
    /// 牌桌阶段
    pub phase: Phase,
    /// 最近一张弃牌
    pub last_discard: Option<Tile>,
    /// 响应窗口中尚未表态的座位（座位号 + 可做的响应）
    pub window: Vec<(usize, Vec<CallKind>)>,
    /// 胜者（仅 Terminal 阶段有意义）
    pub winner: Option<usize>,
    /// 山牌剩余张数
    pub wall_remaining: usize,
    /// 已翻开的宝牌指示牌
    pub indicators: Vec<Tile>,
}

/// 对局结束回调
pub type FinishCallback = Box<dyn FnOnce(Option<usize>) + Send>;

/// 牌桌（Table）
///
/// 四个座位的回合状态机。所有状态变更都经由公开方法进入，
/// 失败的调用不产生部分变更。并发访问由 [`SharedTable`] 提供。
pub struct Table {
    /// 各座位（入座顺序即座位号）
    seats: Vec<Seat>,
    /// 各座位的广播发送端
    senders: Vec<SyncSender<TableUpdate>>,
    /// 牌山
    wall: Wall,
    /// 当前回合座位
    turn: usize,
    /// 牌桌阶段
    phase: Phase,
    /// 响应窗口
    window: Vec<Responder>,
    /// 暂挂的低优先级宣言
    deferred: Option<DeferredClaim>,
    /// 最近一张弃牌（打出者 + 牌）
    last_discard: Option<(usize, Tile)>,
    /// 胜者
    winner: Option<usize>,
    /// 对局结束回调
    on_finish: Option<FinishCallback>,
}

/// 座位数
pub const SEATS: usize = 4;

/// 每个座位的广播缓冲容量
const CHANNEL_CAPACITY: usize = SEATS * 3;

impl Table {
    /// 创建空桌（牌山由调用方提供，通常已用注入的随机源洗切）
    pub fn new(wall: Wall) -> Self {
        Self {
            seats: Vec::new(),
            senders: Vec::new(),
            wall,
            turn: 0,
            phase: Phase::AwaitingDraw,
            window: Vec::new(),
            deferred: None,
            last_discard: None,
            winner: None,
            on_finish: None,
        }
    }

    // ---- 只读访问 ----

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    pub fn seat(&self, index: usize) -> Option<&Seat> {
        self.seats.get(index)
    }

    pub fn last_discard(&self) -> Option<Tile> {
        self.last_discard.map(|(_, tile)| tile)
    }

    /// 响应窗口中尚未表态的座位
    pub fn window_seats(&self) -> Vec<usize> {
        self.window
            .iter()
            .filter(|r| !r.decided)
            .map(|r| r.seat)
            .collect()
    }

    /// 注册对局结束回调（只会被调用一次）
    ///
    /// 回调在持锁状态下执行，其中不得再调用 [`SharedTable`] 的方法。
    pub fn on_finish(&mut self, cb: impl FnOnce(Option<usize>) + Send + 'static) {
        self.on_finish = Some(Box::new(cb));
    }

    /// 全桌快照
    pub fn snapshot(&self) -> TableUpdate {
        TableUpdate {
            seats: self
                .seats
                .iter()
                .map(|s| SeatView {
                    hand: s.hand().to_sorted_vec(),
                    drawn: s.drawn(),
                    melds: s.melds().melds().to_vec(),
                    discards: s.discards().to_vec(),
                    riichi: s.is_riichi(),
                })
                .collect(),
            turn: self.turn,
            phase: self.phase,
            last_discard: self.last_discard(),
            window: self
                .window
                .iter()
                .filter(|r| !r.decided)
                .map(|r| (r.seat, r.calls.clone()))
                .collect(),
            winner: self.winner,
            wall_remaining: self.wall.remaining(),
            indicators: self.wall.indicators(),
        }
    }

    // ---- 入离座 ----

    /// 入座
    ///
    /// 返回座位号与该座位的广播接收端。第四人入座时配牌、
    /// 翻开首张宝牌指示牌并进入庄家的摸牌阶段。
    pub fn join(&mut self) -> Result<(usize, Receiver<TableUpdate>), TableError> {
        if self.phase == Phase::Terminal {
            return Err(TableError::GameOver);
        }
        if self.seats.len() >= SEATS {
            return Err(TableError::TableFull);
        }
        let index = self.seats.len();
        let (tx, rx) = sync_channel(CHANNEL_CAPACITY);
        self.seats.push(Seat::new());
        self.senders.push(tx);
        debug!("seat {} joined", index);

        if self.seats.len() == SEATS {
            for seat in self.seats.iter_mut() {
                seat.deal(&mut self.wall)?;
            }
            self.wall.reveal_indicator()?;
            self.turn = 0;
            self.phase = Phase::AwaitingDraw;
            info!("all seats filled, hands dealt, dealer to draw");
        }
        Ok((index, rx))
    }

    /// 离座
    ///
    /// 任何一人离座即终止整个对局：丢弃全部发送端（通道关闭
    /// 即为终止信号）并进入 Terminal。
    pub fn leave(&mut self, seat: usize) -> Result<(), TableError> {
        if seat >= self.seats.len() {
            return Err(TableError::InvalidSeat(seat));
        }
        info!("seat {} left, tearing down the session", seat);
        self.senders.clear();
        if self.phase != Phase::Terminal {
            self.finish(None);
        }
        Ok(())
    }

    // ---- 回合动作 ----

    /// 当前座位摸牌
    ///
    /// 山牌摸完时流局：进入 Terminal，胜者为空，返回 `None`。
    pub fn draw(&mut self, seat: usize) -> Result<Option<Tile>, TableError> {
        self.ensure_active()?;
        if self.phase != Phase::AwaitingDraw {
            return Err(TableError::WrongPhase);
        }
        if self.turn != seat {
            return Err(TableError::NotYourTurn(seat));
        }
        match self.seats[seat].draw(&mut self.wall) {
            Ok(tile) => {
                self.phase = Phase::AwaitingDiscard;
                debug!("seat {} drew, {} tiles left", seat, self.wall.remaining());
                Ok(Some(tile))
            }
            Err(SeatError::Wall(WallError::Exhausted)) => {
                info!("wall exhausted, exhaustive draw");
                self.finish(None);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 当前座位打牌
    pub fn discard(&mut self, seat: usize, tile: Tile) -> Result<(), TableError> {
        self.ensure_active()?;
        if self.phase != Phase::AwaitingDiscard {
            return Err(TableError::WrongPhase);
        }
        if self.turn != seat {
            return Err(TableError::NotYourTurn(seat));
        }
        self.seats[seat].discard(tile)?;
        debug!("seat {} discarded {}", seat, tile);
        self.turn_end(seat, tile);
        Ok(())
    }

    /// 当前座位立直宣言并打出 `tile`
    pub fn declare_riichi(&mut self, seat: usize, tile: Tile) -> Result<(), TableError> {
        self.ensure_active()?;
        if self.phase != Phase::AwaitingDiscard {
            return Err(TableError::WrongPhase);
        }
        if self.turn != seat {
            return Err(TableError::NotYourTurn(seat));
        }
        self.seats[seat].declare_riichi(tile)?;
        info!("seat {} declared riichi, discarding {}", seat, tile);
        self.turn_end(seat, tile);
        Ok(())
    }

    /// 当前座位暗杠
    ///
    /// 翻开一对新的宝牌指示牌并从牌山补摸一张。
    pub fn concealed_kan(&mut self, seat: usize, tile: Tile) -> Result<(), TableError> {
        self.ensure_active()?;
        if self.phase != Phase::AwaitingDiscard {
            return Err(TableError::WrongPhase);
        }
        if self.turn != seat {
            return Err(TableError::NotYourTurn(seat));
        }
        if !self.seats[seat].can_declare_concealed_kan(tile) {
            return Err(SeatError::QuadNotAllowed(tile).into());
        }
        self.wall.reveal_indicator()?;
        self.seats[seat].declare_concealed_kan(tile)?;
        info!("seat {} declared a concealed quad of {}", seat, tile);
        self.kan_replacement(seat)
    }

    /// 当前座位加杠
    pub fn added_kan(&mut self, seat: usize, tile: Tile) -> Result<(), TableError> {
        self.ensure_active()?;
        if self.phase != Phase::AwaitingDiscard {
            return Err(TableError::WrongPhase);
        }
        if self.turn != seat {
            return Err(TableError::NotYourTurn(seat));
        }
        let holds = self.seats[seat].drawn() == Some(tile) || self.seats[seat].hand().contains(tile);
        if !self.seats[seat].melds().has_triplet(tile) || !holds {
            return Err(SeatError::QuadNotAllowed(tile).into());
        }
        self.wall.reveal_indicator()?;
        self.seats[seat].declare_added_kan(tile)?;
        info!("seat {} upgraded a triplet of {} into a quad", seat, tile);
        self.kan_replacement(seat)
    }

    /// 和牌宣言
    ///
    /// 打牌阶段由当前座位宣言自摸；响应窗口内由待表态者宣言荣和。
    pub fn declare_win(&mut self, seat: usize) -> Result<(), TableError> {
        self.ensure_active()?;
        match self.phase {
            Phase::AwaitingDiscard => {
                if self.turn != seat {
                    return Err(TableError::NotYourTurn(seat));
                }
                if !self.seats[seat].can_tsumo() {
                    return Err(TableError::NotWinning);
                }
                info!("seat {} won by self-draw", seat);
                self.finish(Some(seat));
                Ok(())
            }
            Phase::ResponseWindow => self.take_action(seat, Claim::Ron),
            _ => Err(TableError::WrongPhase),
        }
    }

    // ---- 响应窗口 ----

    /// 对最近一张弃牌做出宣言
    ///
    /// 按显式优先级裁决：荣和 > 碰/杠 > 吃。更高优先级者尚未
    /// 表态时，低优先级宣言先行暂挂，待其全部放弃后再执行；
    /// 更高优先级的宣言会立即顶掉暂挂中的低优先级宣言。
    pub fn take_action(&mut self, seat: usize, claim: Claim) -> Result<(), TableError> {
        self.ensure_active()?;
        if self.phase != Phase::ResponseWindow {
            return Err(TableError::WrongPhase);
        }
        let kind = claim.kind();
        let index = self
            .window
            .iter()
            .position(|r| r.seat == seat)
            .ok_or(TableError::NotInWindow(seat))?;
        if self.window[index].decided {
            return Err(TableError::NotInWindow(seat));
        }
        if !self.window[index].calls.contains(&kind) {
            return Err(TableError::IneligibleCall(seat));
        }
        // 明杠要翻新指示牌；王牌区翻完则在表态前拒绝，窗口保持原状
        if kind == CallKind::Kan && !self.wall.can_reveal_indicator() {
            return Err(WallError::NoMoreIndicators.into());
        }
        // 吃的搭子在此处验证，暂挂的宣言执行时不再会失败
        if let Claim::Chii { partners } = claim {
            let (_, tile) = self.last_discard.ok_or(TableError::NoPendingDiscard)?;
            let mut sorted = partners;
            sorted.sort();
            if !self.seats[seat].hand().chii_partners(tile).contains(&sorted) {
                return Err(SeatError::InvalidMeld.into());
            }
        }
        self.window[index].decided = true;
        debug!("seat {} claimed {:?}", seat, kind);

        match self.deferred {
            // 已有同级或更高的宣言暂挂，后到的让位
            Some(d) if d.claim.kind().priority() >= kind.priority() => {}
            _ => self.deferred = Some(DeferredClaim { seat, claim }),
        }
        self.resolve_window()
    }

    /// 放弃对最近一张弃牌的响应
    pub fn cancel_action(&mut self, seat: usize) -> Result<(), TableError> {
        self.ensure_active()?;
        if self.phase != Phase::ResponseWindow {
            return Err(TableError::WrongPhase);
        }
        let index = self
            .window
            .iter()
            .position(|r| r.seat == seat)
            .ok_or(TableError::NotInWindow(seat))?;
        if self.window[index].decided {
            return Err(TableError::NotInWindow(seat));
        }
        self.window[index].decided = true;
        debug!("seat {} passed", seat);
        self.resolve_window()
    }

    // ---- 内部流转 ----

    fn ensure_active(&self) -> Result<(), TableError> {
        if self.phase == Phase::Terminal {
            return Err(TableError::GameOver);
        }
        if self.seats.len() < SEATS {
            return Err(TableError::NotStarted);
        }
        Ok(())
    }

    /// 打牌后的流转：重新计算响应窗口；无人可响应则轮转到下家
    fn turn_end(&mut self, discarder: usize, tile: Tile) {
        self.last_discard = Some((discarder, tile));
        self.deferred = None;
        self.window.clear();
        for offset in 1..SEATS {
            let seat = (discarder + offset) % SEATS;
            // 吃只能吃上家
            let allow_chii = offset == 1;
            let calls = self.seats[seat].call_options(tile, allow_chii);
            if !calls.is_empty() {
                self.window.push(Responder {
                    seat,
                    calls,
                    decided: false,
                });
            }
        }
        if self.window.is_empty() {
            self.advance_turn();
        } else {
            self.phase = Phase::ResponseWindow;
            debug!("response window open for seats {:?}", self.window_seats());
        }
    }

    fn advance_turn(&mut self) {
        self.turn = (self.turn + 1) % SEATS;
        self.phase = Phase::AwaitingDraw;
        debug!("turn advanced to seat {}", self.turn);
    }

    /// 暂挂宣言不再被更高优先级者阻塞时执行；全员放弃则轮转
    fn resolve_window(&mut self) -> Result<(), TableError> {
        if let Some(d) = self.deferred.take() {
            let priority = d.claim.kind().priority();
            let blocked = self
                .window
                .iter()
                .any(|r| !r.decided && r.max_priority() > priority);
            if blocked {
                self.deferred = Some(d);
                return Ok(());
            }
            return self.execute_claim(d.seat, d.claim);
        }
        if self.window.iter().all(|r| r.decided) {
            self.window.clear();
            self.advance_turn();
        }
        Ok(())
    }

    fn execute_claim(&mut self, seat: usize, claim: Claim) -> Result<(), TableError> {
        let (discarder, tile) = self.last_discard.ok_or(TableError::NoPendingDiscard)?;
        match claim {
            Claim::Ron => {
                if !self.seats[seat].can_ron(tile) {
                    return Err(TableError::NotWinning);
                }
                self.seats[discarder].take_last_discard();
                self.last_discard = None;
                info!("seat {} won on seat {}'s discard {}", seat, discarder, tile);
                self.finish(Some(seat));
            }
            Claim::Chii { partners } => {
                self.seats[seat].call_chii(tile, partners)?;
                info!("seat {} called chii on {}", seat, tile);
                self.seize_discard(discarder, seat);
            }
            Claim::Pon => {
                self.seats[seat].call_pon(tile, [tile, tile])?;
                info!("seat {} called pon on {}", seat, tile);
                self.seize_discard(discarder, seat);
            }
            Claim::Kan => {
                // 受理时已确认还有指示牌可翻；副露成立后再翻
                self.seats[seat].call_kan(tile, [tile, tile, tile])?;
                info!("seat {} called kan on {}", seat, tile);
                self.seize_discard(discarder, seat);
                self.wall.reveal_indicator()?;
                self.kan_replacement(seat)?;
            }
        }
        Ok(())
    }

    /// 副露成立：弃牌从牌河移走，副露者夺取回合
    fn seize_discard(&mut self, discarder: usize, actor: usize) {
        self.seats[discarder].take_last_discard();
        self.last_discard = None;
        self.window.clear();
        self.deferred = None;
        self.turn = actor;
        self.phase = Phase::AwaitingDiscard;
    }

    /// 杠后的补摸；山牌摸完同样流局
    fn kan_replacement(&mut self, seat: usize) -> Result<(), TableError> {
        match self.seats[seat].draw(&mut self.wall) {
            Ok(_) => Ok(()),
            Err(SeatError::Wall(WallError::Exhausted)) => {
                info!("wall exhausted on replacement draw, exhaustive draw");
                self.finish(None);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn finish(&mut self, winner: Option<usize>) {
        self.phase = Phase::Terminal;
        self.winner = winner;
        self.window.clear();
        self.deferred = None;
        if let Some(cb) = self.on_finish.take() {
            cb(winner);
        }
        info!("session finished, winner: {:?}", winner);
    }
}

/// 线程安全的牌桌句柄
///
/// 所有变更入口在同一把锁下串行执行；成功的变更之后，
/// 由独立线程把快照推送到每个座位的缓冲通道上（绝不在
/// 持锁线程上发送）。
#[derive(Clone)]
pub struct SharedTable {
    inner: Arc<Mutex<Table>>,
}

impl SharedTable {
    pub fn new(wall: Wall) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Table::new(wall))),
        }
    }

    /// 在锁下执行变更，成功后广播快照
    fn with<T>(&self, f: impl FnOnce(&mut Table) -> Result<T, TableError>) -> Result<T, TableError> {
        let mut table = self.inner.lock().expect("table lock poisoned");
        let out = f(&mut table)?;
        Self::broadcast(&table);
        Ok(out)
    }

    /// 从独立线程把同一份快照推给每个座位
    fn broadcast(table: &Table) {
        let update = table.snapshot();
        let senders: Vec<SyncSender<TableUpdate>> = table.senders.to_vec();
        thread::spawn(move || {
            for tx in senders {
                // 接收端已关闭则丢弃
                let _ = tx.send(update.clone());
            }
        });
    }

    pub fn join(&self) -> Result<(usize, Receiver<TableUpdate>), TableError> {
        self.with(|t| t.join())
    }

    pub fn leave(&self, seat: usize) -> Result<(), TableError> {
        self.with(|t| t.leave(seat))
    }

    pub fn draw(&self, seat: usize) -> Result<Option<Tile>, TableError> {
        self.with(|t| t.draw(seat))
    }

    pub fn discard(&self, seat: usize, tile: Tile) -> Result<(), TableError> {
        self.with(|t| t.discard(seat, tile))
    }

    pub fn declare_riichi(&self, seat: usize, tile: Tile) -> Result<(), TableError> {
        self.with(|t| t.declare_riichi(seat, tile))
    }

    pub fn concealed_kan(&self, seat: usize, tile: Tile) -> Result<(), TableError> {
        self.with(|t| t.concealed_kan(seat, tile))
    }

    pub fn added_kan(&self, seat: usize, tile: Tile) -> Result<(), TableError> {
        self.with(|t| t.added_kan(seat, tile))
    }

    pub fn declare_win(&self, seat: usize) -> Result<(), TableError> {
        self.with(|t| t.declare_win(seat))
    }

    pub fn take_action(&self, seat: usize, claim: Claim) -> Result<(), TableError> {
        self.with(|t| t.take_action(seat, claim))
    }

    pub fn cancel_action(&self, seat: usize) -> Result<(), TableError> {
        self.with(|t| t.cancel_action(seat))
    }

    pub fn on_finish(&self, cb: impl FnOnce(Option<usize>) + Send + 'static) {
        let mut table = self.inner.lock().expect("table lock poisoned");
        table.on_finish(cb);
    }

    /// 当前快照（只读，不广播）
    pub fn snapshot(&self) -> TableUpdate {
        self.inner.lock().expect("table lock poisoned").snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn seat_with(tiles: &[Tile]) -> Seat {
        let mut seat = Seat::new();
        for &t in tiles {
            seat.hand.add(t).unwrap();
        }
        seat
    }

    /// 直接搭一张进行到打牌阶段的桌子（手牌可控）
    fn crafted_table(seats: Vec<Seat>) -> Table {
        let mut table = Table::new(Wall::new());
        table.seats = seats;
        table.turn = 0;
        table.phase = Phase::AwaitingDiscard;
        table
    }

    /// 听 p2/p5 的 13 张牌
    fn tenpai_for_pin5() -> Seat {
        seat_with(&[
            Tile::Man(1),
            Tile::Man(2),
            Tile::Man(3),
            Tile::Man(4),
            Tile::Man(5),
            Tile::Man(6),
            Tile::Man(7),
            Tile::Man(8),
            Tile::Man(9),
            Tile::Pin(1),
            Tile::Pin(1),
            Tile::Pin(3),
            Tile::Pin(4),
        ])
    }

    #[test]
    fn test_window_membership() {
        let mut table = crafted_table(vec![
            seat_with(&[Tile::Pin(5)]),
            seat_with(&[Tile::Pin(6), Tile::Pin(7)]),
            seat_with(&[Tile::Pin(5), Tile::Pin(5)]),
            seat_with(&[Tile::Wind(crate::tile::Wind::West)]),
        ]);
        table.discard(0, Tile::Pin(5)).unwrap();

        assert_eq!(table.phase(), Phase::ResponseWindow);
        assert_eq!(table.window_seats(), vec![1, 2]);
        assert_eq!(table.last_discard(), Some(Tile::Pin(5)));

        // 窗口外的座位不得表态
        assert_eq!(table.cancel_action(3), Err(TableError::NotInWindow(3)));
    }

    #[test]
    fn test_no_callers_advances_turn() {
        let mut table = crafted_table(vec![
            seat_with(&[Tile::Dragon(crate::tile::Dragon::White)]),
            seat_with(&[Tile::Man(1)]),
            seat_with(&[Tile::Man(2)]),
            seat_with(&[Tile::Man(3)]),
        ]);
        table.discard(0, Tile::Dragon(crate::tile::Dragon::White)).unwrap();

        assert_eq!(table.phase(), Phase::AwaitingDraw);
        assert_eq!(table.turn(), 1);
    }

    #[test]
    fn test_pon_preempts_deferred_chii() {
        let mut table = crafted_table(vec![
            seat_with(&[Tile::Pin(5)]),
            seat_with(&[Tile::Pin(6), Tile::Pin(7)]),
            seat_with(&[Tile::Pin(5), Tile::Pin(5)]),
            seat_with(&[Tile::Wind(crate::tile::Wind::West)]),
        ]);
        table.discard(0, Tile::Pin(5)).unwrap();

        // 碰家未表态，吃先行暂挂
        table
            .take_action(1, Claim::Chii { partners: [Tile::Pin(6), Tile::Pin(7)] })
            .unwrap();
        assert_eq!(table.phase(), Phase::ResponseWindow);
        assert!(table.seat(1).unwrap().melds().is_empty());

        // 碰顶掉暂挂的吃并立即执行
        table.take_action(2, Claim::Pon).unwrap();
        assert_eq!(table.phase(), Phase::AwaitingDiscard);
        assert_eq!(table.turn(), 2);
        assert_eq!(
            table.seat(2).unwrap().melds().melds(),
            &[Meld::Triplet { tile: Tile::Pin(5) }]
        );
        assert!(table.seat(1).unwrap().melds().is_empty());
        // 弃牌被移出牌河
        assert!(table.seat(0).unwrap().discards().is_empty());
        assert_eq!(table.last_discard(), None);
    }

    #[test]
    fn test_deferred_chii_fires_after_pon_declines() {
        let mut table = crafted_table(vec![
            seat_with(&[Tile::Pin(5)]),
            seat_with(&[Tile::Pin(6), Tile::Pin(7)]),
            seat_with(&[Tile::Pin(5), Tile::Pin(5)]),
            seat_with(&[Tile::Wind(crate::tile::Wind::West)]),
        ]);
        table.discard(0, Tile::Pin(5)).unwrap();

        table
            .take_action(1, Claim::Chii { partners: [Tile::Pin(6), Tile::Pin(7)] })
            .unwrap();
        assert_eq!(table.phase(), Phase::ResponseWindow);

        // 碰家放弃后，暂挂的吃立即成立
        table.cancel_action(2).unwrap();
        assert_eq!(table.phase(), Phase::AwaitingDiscard);
        assert_eq!(table.turn(), 1);
        assert_eq!(
            table.seat(1).unwrap().melds().melds(),
            &[Meld::Run {
                tiles: [Tile::Pin(5), Tile::Pin(6), Tile::Pin(7)]
            }]
        );
    }

    #[test]
    fn test_ron_beats_deferred_pon() {
        let mut table = crafted_table(vec![
            seat_with(&[Tile::Pin(5)]),
            seat_with(&[Tile::Wind(crate::tile::Wind::West)]),
            seat_with(&[Tile::Pin(5), Tile::Pin(5)]),
            tenpai_for_pin5(),
        ]);
        let result = Arc::new(AtomicI64::new(-2));
        {
            let result = Arc::clone(&result);
            table.on_finish(move |winner| {
                result.store(winner.map_or(-1, |w| w as i64), Ordering::SeqCst);
            });
        }
        table.discard(0, Tile::Pin(5)).unwrap();
        assert_eq!(table.window_seats(), vec![2, 3]);

        // 荣和家未表态，碰暂挂
        table.take_action(2, Claim::Pon).unwrap();
        assert_eq!(table.phase(), Phase::ResponseWindow);

        table.declare_win(3).unwrap();
        assert_eq!(table.phase(), Phase::Terminal);
        assert_eq!(table.winner(), Some(3));
        assert!(table.seat(2).unwrap().melds().is_empty());
        // 放铳的牌移出牌河
        assert!(table.seat(0).unwrap().discards().is_empty());
        assert_eq!(result.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_deferred_pon_fires_after_ron_declines() {
        let mut table = crafted_table(vec![
            seat_with(&[Tile::Pin(5)]),
            seat_with(&[Tile::Wind(crate::tile::Wind::West)]),
            seat_with(&[Tile::Pin(5), Tile::Pin(5)]),
            tenpai_for_pin5(),
        ]);
        table.discard(0, Tile::Pin(5)).unwrap();

        table.take_action(2, Claim::Pon).unwrap();
        table.cancel_action(3).unwrap();

        assert_eq!(table.phase(), Phase::AwaitingDiscard);
        assert_eq!(table.turn(), 2);
        assert!(table.seat(2).unwrap().melds().has_triplet(Tile::Pin(5)));
    }

    #[test]
    fn test_claim_requires_eligibility() {
        let mut table = crafted_table(vec![
            seat_with(&[Tile::Pin(5)]),
            seat_with(&[Tile::Pin(6), Tile::Pin(7)]),
            seat_with(&[Tile::Pin(5), Tile::Pin(5)]),
            seat_with(&[Tile::Wind(crate::tile::Wind::West)]),
        ]);
        table.discard(0, Tile::Pin(5)).unwrap();

        // 吃家没有碰的资格
        assert_eq!(table.take_action(1, Claim::Pon), Err(TableError::IneligibleCall(1)));
        // 搭子不对的吃被拒绝
        assert_eq!(
            table.take_action(1, Claim::Chii { partners: [Tile::Pin(6), Tile::Pin(6)] }),
            Err(TableError::Seat(SeatError::InvalidMeld))
        );
        // 拒绝不算表态
        assert_eq!(table.window_seats(), vec![1, 2]);
        table
            .take_action(1, Claim::Chii { partners: [Tile::Pin(7), Tile::Pin(6)] })
            .unwrap();
    }

    #[test]
    fn test_tsumo_declaration() {
        let mut winner = tenpai_for_pin5();
        winner.drawn = Some(Tile::Pin(5));
        let mut table = crafted_table(vec![
            winner,
            seat_with(&[Tile::Man(1)]),
            seat_with(&[Tile::Man(2)]),
            seat_with(&[Tile::Man(3)]),
        ]);

        table.declare_win(0).unwrap();
        assert_eq!(table.phase(), Phase::Terminal);
        assert_eq!(table.winner(), Some(0));
        // 结束后一切动作拒绝
        assert_eq!(table.discard(0, Tile::Pin(5)), Err(TableError::GameOver));
    }

    #[test]
    fn test_tsumo_requires_winning_hand() {
        let mut seat = seat_with(&[Tile::Man(1), Tile::Man(5)]);
        seat.drawn = Some(Tile::Sou(9));
        let mut table = crafted_table(vec![
            seat,
            seat_with(&[Tile::Man(1)]),
            seat_with(&[Tile::Man(2)]),
            seat_with(&[Tile::Man(3)]),
        ]);
        assert_eq!(table.declare_win(0), Err(TableError::NotWinning));
        assert_eq!(table.phase(), Phase::AwaitingDiscard);
    }

    #[test]
    fn test_riichi_declaration_flows_like_a_discard() {
        let mut declarer = tenpai_for_pin5();
        declarer.drawn = Some(Tile::Wind(crate::tile::Wind::North));
        let mut table = crafted_table(vec![
            declarer,
            seat_with(&[Tile::Man(1)]),
            seat_with(&[Tile::Man(2)]),
            seat_with(&[Tile::Man(3)]),
        ]);

        // 打破听牌的立直被拒绝
        assert_eq!(
            table.declare_riichi(0, Tile::Pin(1)),
            Err(TableError::Seat(SeatError::RiichiNotAllowed))
        );

        table
            .declare_riichi(0, Tile::Wind(crate::tile::Wind::North))
            .unwrap();
        assert!(table.seat(0).unwrap().is_riichi());
        // 无人可响应北风，回合照常轮转
        assert_eq!(table.phase(), Phase::AwaitingDraw);
        assert_eq!(table.turn(), 1);
        assert_eq!(table.last_discard(), Some(Tile::Wind(crate::tile::Wind::North)));
    }

    #[test]
    fn test_concealed_kan_reveals_and_replaces() {
        let mut seat = seat_with(&[
            Tile::Man(3),
            Tile::Man(3),
            Tile::Man(3),
            Tile::Man(3),
            Tile::Pin(1),
        ]);
        seat.drawn = Some(Tile::Sou(9));
        let mut table = crafted_table(vec![
            seat,
            seat_with(&[Tile::Man(1)]),
            seat_with(&[Tile::Man(2)]),
            seat_with(&[Tile::Man(4)]),
        ]);

        table.concealed_kan(0, Tile::Man(3)).unwrap();
        assert_eq!(table.phase(), Phase::AwaitingDiscard);
        assert_eq!(table.turn(), 0);
        assert_eq!(table.wall.indicators().len(), 1);
        // 补摸到位
        assert!(table.seat(0).unwrap().drawn().is_some());
        assert_eq!(
            table.seat(0).unwrap().melds().melds(),
            &[Meld::Quad {
                tile: Tile::Man(3),
                concealed: true
            }]
        );
    }

    #[test]
    fn test_kan_claim_rejected_when_indicators_exhausted() {
        let mut table = crafted_table(vec![
            seat_with(&[Tile::Pin(5)]),
            seat_with(&[Tile::Man(1)]),
            seat_with(&[Tile::Pin(5), Tile::Pin(5), Tile::Pin(5)]),
            seat_with(&[Tile::Man(2)]),
        ]);
        for _ in 0..Wall::MAX_INDICATORS {
            table.wall.reveal_indicator().unwrap();
        }
        table.discard(0, Tile::Pin(5)).unwrap();
        assert_eq!(table.window_seats(), vec![2]);

        // 指示牌翻完后明杠不受理，窗口保持可表态
        assert_eq!(
            table.take_action(2, Claim::Kan),
            Err(TableError::Wall(WallError::NoMoreIndicators))
        );
        assert_eq!(table.phase(), Phase::ResponseWindow);
        assert_eq!(table.window_seats(), vec![2]);

        // 同一弃牌仍可改为碰
        table.take_action(2, Claim::Pon).unwrap();
        assert_eq!(table.phase(), Phase::AwaitingDiscard);
        assert_eq!(table.turn(), 2);
        assert!(table.seat(2).unwrap().melds().has_triplet(Tile::Pin(5)));
    }

    #[test]
    fn test_join_and_deal() {
        let shared = SharedTable::new(Wall::new());
        let mut receivers = Vec::new();
        for expected in 0..SEATS {
            let (index, rx) = shared.join().unwrap();
            assert_eq!(index, expected);
            receivers.push(rx);
        }
        assert_eq!(shared.join().unwrap_err(), TableError::TableFull);

        let update = shared.snapshot();
        assert_eq!(update.phase, Phase::AwaitingDraw);
        assert_eq!(update.turn, 0);
        for view in &update.seats {
            assert_eq!(view.hand.len(), 13);
        }
        assert_eq!(update.indicators.len(), 1);
        assert_eq!(
            update.wall_remaining,
            Tile::TOTAL_COUNT - Wall::DEAD_WALL - SEATS * 13
        );

        // 第四人入座触发的广播到达每个座位。
        // 各次广播来自独立线程，到达顺序不保证，等到满员快照为止。
        for rx in &receivers {
            let full = loop {
                let seen = rx.recv().unwrap();
                if seen.seats.len() == SEATS {
                    break seen;
                }
            };
            for view in &full.seats {
                assert_eq!(view.hand.len(), 13);
            }
        }
    }

    #[test]
    fn test_actions_rejected_before_full() {
        let shared = SharedTable::new(Wall::new());
        let _ = shared.join().unwrap();
        assert_eq!(shared.draw(0).unwrap_err(), TableError::NotStarted);
    }

    #[test]
    fn test_out_of_turn_rejected() {
        let shared = SharedTable::new(Wall::new());
        for _ in 0..SEATS {
            let _ = shared.join().unwrap();
        }
        assert_eq!(shared.draw(1).unwrap_err(), TableError::NotYourTurn(1));
        // 摸牌前不能打牌
        assert_eq!(
            shared.discard(0, Tile::Man(1)).unwrap_err(),
            TableError::WrongPhase
        );
    }

    #[test]
    fn test_leave_tears_down_session() {
        let shared = SharedTable::new(Wall::new());
        let mut receivers = Vec::new();
        for _ in 0..SEATS {
            let (_, rx) = shared.join().unwrap();
            receivers.push(rx);
        }
        let result = Arc::new(AtomicI64::new(-2));
        {
            let result = Arc::clone(&result);
            shared.on_finish(move |winner| {
                result.store(winner.map_or(-1, |w| w as i64), Ordering::SeqCst);
            });
        }

        shared.leave(2).unwrap();
        assert_eq!(shared.snapshot().phase, Phase::Terminal);
        assert_eq!(result.load(Ordering::SeqCst), -1);

        // 发送端全部丢弃，接收端排空后断开
        for rx in receivers {
            while rx.recv().is_ok() {}
        }
        assert_eq!(shared.draw(0).unwrap_err(), TableError::GameOver);
    }
}
