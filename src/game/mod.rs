/// 对局逻辑模块
///
/// 包含座席、副露与牌桌回合状态机

pub mod meld;
pub mod seat;
pub mod table;

// 重新导出常用类型
pub use meld::{Meld, MeldError, MeldSet};
pub use seat::{CallKind, Seat, SeatError};
pub use table::{
    Claim, Phase, SeatView, SharedTable, Table, TableError, TableUpdate, SEATS,
};
