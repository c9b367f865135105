use std::fmt;

/// 麻将牌类型
///
/// 日麻使用 34 种牌：万、筒、索各 9 种（1-9），风牌 4 种，三元牌 3 种，
/// 每种 4 张，共 136 张。牌按值比较（同种牌彼此相等），派生的全序
/// 即为理牌顺序：万 < 筒 < 索 < 风 < 三元。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Tile {
    /// 万子（1-9）
    Man(u8),
    /// 筒子（1-9）
    Pin(u8),
    /// 索子（1-9）
    Sou(u8),
    /// 风牌（東南西北）
    Wind(Wind),
    /// 三元牌（白発中）
    Dragon(Dragon),
}

/// 数牌花色
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Suit {
    Man = 0,
    Pin = 1,
    Sou = 2,
}

/// 风牌种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Wind {
    East = 0,
    South = 1,
    West = 2,
    North = 3,
}

/// 三元牌种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Dragon {
    White = 0,
    Green = 1,
    Red = 2,
}

impl Suit {
    /// 所有数牌花色
    pub fn all() -> [Suit; 3] {
        [Suit::Man, Suit::Pin, Suit::Sou]
    }
}

impl Tile {
    /// 牌的种类数：34
    pub const KIND_COUNT: usize = 34;

    /// 每种牌的张数：4
    pub const COPIES: usize = 4;

    /// 全部张数：136
    pub const TOTAL_COUNT: usize = Self::KIND_COUNT * Self::COPIES;

    /// 数牌的数字范围：1-9
    pub const MIN_RANK: u8 = 1;
    pub const MAX_RANK: u8 = 9;

    /// 创建一张数牌，验证数字有效性
    pub fn suited(suit: Suit, rank: u8) -> Option<Self> {
        if !(Self::MIN_RANK..=Self::MAX_RANK).contains(&rank) {
            return None;
        }
        Some(match suit {
            Suit::Man => Tile::Man(rank),
            Suit::Pin => Tile::Pin(rank),
            Suit::Sou => Tile::Sou(rank),
        })
    }

    /// 获取花色（字牌返回 None）
    pub fn suit(&self) -> Option<Suit> {
        match self {
            Tile::Man(_) => Some(Suit::Man),
            Tile::Pin(_) => Some(Suit::Pin),
            Tile::Sou(_) => Some(Suit::Sou),
            _ => None,
        }
    }

    /// 获取数字（字牌返回 None）
    pub fn rank(&self) -> Option<u8> {
        match self {
            Tile::Man(r) | Tile::Pin(r) | Tile::Sou(r) => Some(*r),
            _ => None,
        }
    }

    /// 是否为数牌
    pub fn is_suited(&self) -> bool {
        matches!(self, Tile::Man(_) | Tile::Pin(_) | Tile::Sou(_))
    }

    /// 是否为字牌（风牌或三元牌）
    ///
    /// 不变式：`is_suited()` 与 `is_honor()` 恰好一个成立
    pub fn is_honor(&self) -> bool {
        !self.is_suited()
    }

    /// 转换为种类索引（0-33）
    ///
    /// 映射规则：
    /// - 万子：0-8
    /// - 筒子：9-17
    /// - 索子：18-26
    /// - 风牌：27-30
    /// - 三元牌：31-33
    ///
    /// 索引顺序与派生的 `Ord` 一致。
    pub fn to_index(&self) -> usize {
        match self {
            Tile::Man(r) => (*r - 1) as usize,
            Tile::Pin(r) => 9 + (*r - 1) as usize,
            Tile::Sou(r) => 18 + (*r - 1) as usize,
            Tile::Wind(w) => 27 + *w as usize,
            Tile::Dragon(d) => 31 + *d as usize,
        }
    }

    /// 从种类索引创建牌（索引范围 0-33）
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0..=8 => Some(Tile::Man(index as u8 + 1)),
            9..=17 => Some(Tile::Pin((index - 9) as u8 + 1)),
            18..=26 => Some(Tile::Sou((index - 18) as u8 + 1)),
            27 => Some(Tile::Wind(Wind::East)),
            28 => Some(Tile::Wind(Wind::South)),
            29 => Some(Tile::Wind(Wind::West)),
            30 => Some(Tile::Wind(Wind::North)),
            31 => Some(Tile::Dragon(Dragon::White)),
            32 => Some(Tile::Dragon(Dragon::Green)),
            33 => Some(Tile::Dragon(Dragon::Red)),
            _ => None,
        }
    }

    /// 遍历全部 34 种牌（按理牌顺序）
    pub fn all() -> impl Iterator<Item = Tile> {
        (0..Self::KIND_COUNT).map(|i| Tile::from_index(i).expect("index in range"))
    }

    /// 同花色顺位后一张牌（8 万 -> 9 万；9 万、字牌 -> None）
    pub fn next_in_suit(&self) -> Option<Tile> {
        let suit = self.suit()?;
        let rank = self.rank()?;
        Tile::suited(suit, rank + 1)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tile::Man(r) => write!(f, "m{}", r),
            Tile::Pin(r) => write!(f, "p{}", r),
            Tile::Sou(r) => write!(f, "s{}", r),
            Tile::Wind(Wind::East) => write!(f, "東"),
            Tile::Wind(Wind::South) => write!(f, "南"),
            Tile::Wind(Wind::West) => write!(f, "西"),
            Tile::Wind(Wind::North) => write!(f, "北"),
            Tile::Dragon(Dragon::White) => write!(f, "白"),
            Tile::Dragon(Dragon::Green) => write!(f, "発"),
            Tile::Dragon(Dragon::Red) => write!(f, "中"),
        }
    }
}
