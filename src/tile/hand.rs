use super::tile::Tile;
use std::collections::HashMap;
use thiserror::Error;

/// 手牌错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandError {
    /// 手牌已达上限（13 张）
    #[error("hand already holds the maximum of {} tiles", Hand::MAX_TILES)]
    Full,
    /// 手牌中没有这张牌
    #[error("tile {0} not present in hand")]
    TileNotFound(Tile),
}

/// 手牌（门前部分）
///
/// 使用数量映射存储，支持 O(1) 的添加、移除和计数。
/// 上限 13 张；刚摸到的牌由 Seat 单独持有，评估时临时并入。
///
/// 不变式：移除不存在的牌是硬错误，不会静默忽略；批量移除是
/// 全有或全无的（先验证后应用）。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hand {
    /// 牌的数量映射：Tile -> 数量（1-4）
    tiles: HashMap<Tile, u8>,
    /// 总牌数（用于快速查询）
    total: usize,
}

impl Hand {
    /// 门前手牌上限
    pub const MAX_TILES: usize = 13;

    /// 创建空手牌
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一张牌
    pub fn add(&mut self, tile: Tile) -> Result<(), HandError> {
        if self.total >= Self::MAX_TILES {
            return Err(HandError::Full);
        }
        *self.tiles.entry(tile).or_insert(0) += 1;
        self.total += 1;
        Ok(())
    }

    /// 移除一张牌
    ///
    /// 牌不存在时返回 `HandError::TileNotFound`，手牌不变。
    pub fn remove(&mut self, tile: Tile) -> Result<(), HandError> {
        match self.tiles.get_mut(&tile) {
            Some(count) if *count > 0 => {
                *count -= 1;
                self.total -= 1;
                if *count == 0 {
                    self.tiles.remove(&tile);
                }
                Ok(())
            }
            _ => Err(HandError::TileNotFound(tile)),
        }
    }

    /// 批量移除（事务性）
    ///
    /// 先验证全部请求的牌都在手牌中，再一次性移除；
    /// 任何一张缺失则整批失败，手牌完全不变。
    pub fn remove_many(&mut self, tiles: &[Tile]) -> Result<(), HandError> {
        let mut needed: HashMap<Tile, u8> = HashMap::new();
        for &tile in tiles {
            *needed.entry(tile).or_insert(0) += 1;
        }
        for (&tile, &need) in &needed {
            if self.count(tile) < need {
                return Err(HandError::TileNotFound(tile));
            }
        }
        for &tile in tiles {
            self.remove(tile).expect("validated above");
        }
        Ok(())
    }

    /// 原子替换：移除 `old` 并放入 `new`
    ///
    /// 用于打出非摸到的那张牌时把摸牌并入手牌。
    /// `old` 不存在时手牌不变。
    pub fn replace(&mut self, new: Tile, old: Tile) -> Result<(), HandError> {
        if self.count(old) == 0 {
            return Err(HandError::TileNotFound(old));
        }
        self.remove(old).expect("checked above");
        *self.tiles.entry(new).or_insert(0) += 1;
        self.total += 1;
        Ok(())
    }

    /// 查询某张牌的数量
    pub fn count(&self, tile: Tile) -> u8 {
        self.tiles.get(&tile).copied().unwrap_or(0)
    }

    /// 是否持有某张牌
    pub fn contains(&self, tile: Tile) -> bool {
        self.count(tile) > 0
    }

    /// 获取总牌数
    pub fn len(&self) -> usize {
        self.total
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// 数量映射（供判定器遍历）
    pub fn counts(&self) -> &HashMap<Tile, u8> {
        &self.tiles
    }

    /// 转换为理牌顺序的向量（用于显示和形状搜索）
    ///
    /// 排序规则：先万、筒、索按数字，后风牌、三元牌。
    pub fn to_sorted_vec(&self) -> Vec<Tile> {
        let mut result = Vec::with_capacity(self.total);
        for tile in Tile::all() {
            for _ in 0..self.count(tile) {
                result.push(tile);
            }
        }
        result
    }

    /// 枚举可与来牌组成顺子的两张搭子
    ///
    /// 来牌作为顺子的高、中、低张各检查一个相邻窗口；
    /// 仅数牌可以吃，字牌返回空。
    pub fn chii_partners(&self, tile: Tile) -> Vec<[Tile; 2]> {
        let mut pairs = Vec::new();
        let (suit, rank) = match (tile.suit(), tile.rank()) {
            (Some(s), Some(r)) => (s, r),
            _ => return pairs,
        };

        let at = |r: u8| Tile::suited(suit, r);
        let have = |t: Option<Tile>| t.map(|t| self.contains(t)).unwrap_or(false);

        // 来牌作高张：(n-2, n-1)
        if rank >= 3 {
            if let (Some(a), Some(b)) = (at(rank - 2), at(rank - 1)) {
                if self.contains(a) && self.contains(b) {
                    pairs.push([a, b]);
                }
            }
        }
        // 来牌作中张：(n-1, n+1)
        if (2..=8).contains(&rank) && have(at(rank - 1)) && have(at(rank + 1)) {
            pairs.push([at(rank - 1).expect("rank in range"), at(rank + 1).expect("rank in range")]);
        }
        // 来牌作低张：(n+1, n+2)
        if rank <= 7 && have(at(rank + 1)) && have(at(rank + 2)) {
            pairs.push([at(rank + 1).expect("rank in range"), at(rank + 2).expect("rank in range")]);
        }

        pairs
    }

    /// 枚举可与来牌组成刻子的两张搭子（手牌中同种牌 >= 2）
    pub fn pon_partners(&self, tile: Tile) -> Vec<[Tile; 2]> {
        if self.count(tile) >= 2 {
            vec![[tile, tile]]
        } else {
            Vec::new()
        }
    }

    /// 枚举可与来牌组成明杠的三张搭子（手牌中同种牌 >= 3）
    pub fn kan_partners(&self, tile: Tile) -> Vec<[Tile; 3]> {
        if self.count(tile) >= 3 {
            vec![[tile, tile, tile]]
        } else {
            Vec::new()
        }
    }
}
