use super::tile::Tile;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// 牌山错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WallError {
    /// 山牌已摸完
    #[error("wall exhausted")]
    Exhausted,
    /// 王牌区没有可翻的指示牌
    #[error("no more dora indicators to reveal")]
    NoMoreIndicators,
}

/// 牌山（Wall）
///
/// 136 张全牌，末尾 14 张为王牌区（不供摸牌），其中按对
/// 存放表/里宝牌指示牌。随机源由调用方注入，同一种子
/// 生成确定的牌序，便于测试。
#[derive(Debug, Clone)]
pub struct Wall {
    /// 全部牌（前段为山牌，后段为王牌区）
    tiles: Box<[Tile]>,
    /// 已摸取的张数
    drawn: usize,
    /// 已翻开的指示牌对数
    revealed: usize,
}

impl Wall {
    /// 王牌区张数
    pub const DEAD_WALL: usize = 14;

    /// 最多可翻的指示牌对数（表 + 里为一对）
    pub const MAX_INDICATORS: usize = 5;

    /// 创建未洗切的牌山（按种类顺序，每种 4 张）
    pub fn new() -> Self {
        let mut tiles = Vec::with_capacity(Tile::TOTAL_COUNT);
        for tile in Tile::all() {
            for _ in 0..Tile::COPIES {
                tiles.push(tile);
            }
        }
        Self {
            tiles: tiles.into_boxed_slice(),
            drawn: 0,
            revealed: 0,
        }
    }

    /// 用注入的随机源创建并洗切
    pub fn shuffled<R: Rng>(rng: &mut R) -> Self {
        let mut wall = Self::new();
        wall.shuffle(rng);
        wall
    }

    /// 洗切（Fisher-Yates）
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        let mut tiles: Vec<Tile> = self.tiles.to_vec();
        tiles.shuffle(rng);
        self.tiles = tiles.into_boxed_slice();
        self.drawn = 0;
        self.revealed = 0;
    }

    /// 摸一张牌
    ///
    /// 山牌（王牌区之外）摸完后返回 `WallError::Exhausted`；
    /// 流局的处理交给调用方。
    pub fn draw(&mut self) -> Result<Tile, WallError> {
        if self.remaining() == 0 {
            return Err(WallError::Exhausted);
        }
        let tile = self.tiles[self.drawn];
        self.drawn += 1;
        Ok(tile)
    }

    /// 翻开下一对宝牌指示牌（表 + 里）
    pub fn reveal_indicator(&mut self) -> Result<(), WallError> {
        if self.revealed >= Self::MAX_INDICATORS {
            return Err(WallError::NoMoreIndicators);
        }
        self.revealed += 1;
        Ok(())
    }

    /// 王牌区是否还有未翻的指示牌
    pub fn can_reveal_indicator(&self) -> bool {
        self.revealed < Self::MAX_INDICATORS
    }

    /// 已翻开的表宝牌指示牌
    pub fn indicators(&self) -> Vec<Tile> {
        let base = self.tiles.len() - Self::DEAD_WALL;
        (0..self.revealed).map(|i| self.tiles[base + 2 * i]).collect()
    }

    /// 已翻开的里宝牌指示牌
    pub fn hidden_indicators(&self) -> Vec<Tile> {
        let base = self.tiles.len() - Self::DEAD_WALL;
        (0..self.revealed).map(|i| self.tiles[base + 2 * i + 1]).collect()
    }

    /// 剩余可摸张数（不含王牌区）
    pub fn remaining(&self) -> usize {
        (self.tiles.len() - Self::DEAD_WALL).saturating_sub(self.drawn)
    }

    /// 山牌是否已摸完
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

impl Default for Wall {
    fn default() -> Self {
        Self::new()
    }
}
