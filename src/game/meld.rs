use crate::tile::Tile;
use thiserror::Error;

/// 副露错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MeldError {
    /// 没有可升级为加杠的碰
    #[error("no triplet of {0} to upgrade into an added quad")]
    NoTripletToUpgrade(Tile),
}

/// 一组副露（或暗杠）
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Meld {
    /// 吃（顺子，按理牌顺序的三张）
    Run { tiles: [Tile; 3] },
    /// 碰（刻子）
    Triplet { tile: Tile },
    /// 杠（四张；`concealed` 为暗杠）
    Quad { tile: Tile, concealed: bool },
}

impl Meld {
    /// 是否对外公开（暗杠不算公开副露）
    pub fn is_open(&self) -> bool {
        !matches!(self, Meld::Quad { concealed: true, .. })
    }
}

/// 副露区（Meld Set）
///
/// 追加式账本：条目一经记录不再变动，唯一的例外是
/// 碰升级为加杠时原条目就地替换。
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct MeldSet {
    melds: Vec<Meld>,
}

impl MeldSet {
    /// 创建空副露区
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一组吃（来牌 + 两张搭子，存为理牌顺序）
    pub fn add_run(&mut self, taken: Tile, partners: [Tile; 2]) {
        let mut tiles = [taken, partners[0], partners[1]];
        tiles.sort();
        self.melds.push(Meld::Run { tiles });
    }

    /// 记录一组碰
    pub fn add_triplet(&mut self, tile: Tile) {
        self.melds.push(Meld::Triplet { tile });
    }

    /// 记录一组明杠
    pub fn add_quad(&mut self, tile: Tile) {
        self.melds.push(Meld::Quad { tile, concealed: false });
    }

    /// 记录一组暗杠
    pub fn add_concealed_quad(&mut self, tile: Tile) {
        self.melds.push(Meld::Quad { tile, concealed: true });
    }

    /// 加杠：把已有的碰就地升级为杠
    pub fn upgrade_to_quad(&mut self, tile: Tile) -> Result<(), MeldError> {
        for meld in self.melds.iter_mut() {
            if let Meld::Triplet { tile: t } = meld {
                if *t == tile {
                    *meld = Meld::Quad { tile, concealed: false };
                    return Ok(());
                }
            }
        }
        Err(MeldError::NoTripletToUpgrade(tile))
    }

    /// 是否持有可加杠的碰
    pub fn has_triplet(&self, tile: Tile) -> bool {
        self.melds
            .iter()
            .any(|m| matches!(m, Meld::Triplet { tile: t } if *t == tile))
    }

    /// 副露组数（含暗杠）
    pub fn len(&self) -> usize {
        self.melds.len()
    }

    /// 是否没有任何副露
    pub fn is_empty(&self) -> bool {
        self.melds.is_empty()
    }

    /// 手牌是否已因副露而非门前清（暗杠不破门清）
    pub fn is_open(&self) -> bool {
        self.melds.iter().any(|m| m.is_open())
    }

    /// 全部条目
    pub fn melds(&self) -> &[Meld] {
        &self.melds
    }
}
