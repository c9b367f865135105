/// 立直麻将对局引擎
///
/// 手牌判定与四人牌桌回合状态机的 Rust 实现

pub mod game;
pub mod tile;

// 重新导出常用类型
pub use game::meld::{Meld, MeldError, MeldSet};
pub use game::seat::{CallKind, Seat, SeatError};
pub use game::table::{
    Claim, Phase, SeatView, SharedTable, Table, TableError, TableUpdate, SEATS,
};
pub use tile::hand::{Hand, HandError};
pub use tile::tile::{Dragon, Suit, Tile, Wind};
pub use tile::wall::{Wall, WallError};
pub use tile::win_check::{Group, WinChecker, WinResult};
