/// 牌相关模块
///
/// 包含牌（Tile）、手牌（Hand）、牌山（Wall）与和牌判定（WinChecker）

pub mod hand;
pub mod tile;
pub mod wall;
pub mod win_check;

// 重新导出常用类型
pub use hand::{Hand, HandError};
pub use tile::{Dragon, Suit, Tile, Wind};
pub use wall::{Wall, WallError};
pub use win_check::{is_win, Group, WinChecker, WinResult};
