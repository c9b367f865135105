use crate::game::meld::{MeldError, MeldSet};
use crate::tile::{Hand, HandError, Tile, Wall, WallError, WinChecker};
use thiserror::Error;

/// 座席错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SeatError {
    /// 已经配过牌
    #[error("seat already received its starting hand")]
    AlreadyDealt,
    /// 已经持有摸牌
    #[error("seat already holds a drawn tile")]
    AlreadyDrawn,
    /// 立直后只能打摸到的牌
    #[error("riichi locks the discard to the drawn tile")]
    RiichiLocked,
    /// 不满足立直条件
    #[error("riichi declaration not allowed")]
    RiichiNotAllowed,
    /// 指定的搭子不能与来牌组成合法面子
    #[error("partner tiles do not form a legal meld with the taken tile")]
    InvalidMeld,
    /// 不满足暗杠/加杠条件
    #[error("quad declaration not allowed for {0}")]
    QuadNotAllowed(Tile),
    /// 和牌宣言未通过验证
    #[error("winning declaration does not verify")]
    NotWinning,
    #[error(transparent)]
    Hand(#[from] HandError),
    #[error(transparent)]
    Meld(#[from] MeldError),
    #[error(transparent)]
    Wall(#[from] WallError),
}

/// 响应种类（对他家打出的牌可做的动作）
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CallKind {
    /// 吃（仅下家）
    Chii,
    /// 碰
    Pon,
    /// 明杠
    Kan,
    /// 荣和
    Ron,
}

impl CallKind {
    /// 响应优先级：荣和 > 碰/杠 > 吃
    pub fn priority(&self) -> u8 {
        match self {
            CallKind::Ron => 2,
            CallKind::Pon | CallKind::Kan => 1,
            CallKind::Chii => 0,
        }
    }
}

/// 座席（Seat）
///
/// 组合一名玩家的手牌、副露区、牌河、摸牌与立直状态，
/// 对外提供全部出牌动作；规则合法性委托给 Hand / WinChecker。
#[derive(Debug)]
pub struct Seat {
    /// 门前手牌
    pub(crate) hand: Hand,
    /// 副露区
    pub(crate) melds: MeldSet,
    /// 牌河（自家的弃牌，按打出顺序）
    discards: Vec<Tile>,
    /// 刚摸到、尚未打出的牌
    pub(crate) drawn: Option<Tile>,
    /// 是否已立直
    riichi: bool,
    /// 和牌判定器（带缓存，座席独占）
    checker: WinChecker,
}

impl Seat {
    /// 创建空座席
    pub fn new() -> Self {
        Self {
            hand: Hand::new(),
            melds: MeldSet::new(),
            discards: Vec::new(),
            drawn: None,
            riichi: false,
            checker: WinChecker::new(),
        }
    }

    // ---- 只读访问 ----

    pub fn hand(&self) -> &Hand {
        &self.hand
    }

    pub fn melds(&self) -> &MeldSet {
        &self.melds
    }

    pub fn discards(&self) -> &[Tile] {
        &self.discards
    }

    pub fn drawn(&self) -> Option<Tile> {
        self.drawn
    }

    pub fn is_riichi(&self) -> bool {
        self.riichi
    }

    /// 牌河最后一张（等待响应窗口处理的弃牌）
    pub fn last_discard(&self) -> Option<Tile> {
        self.discards.last().copied()
    }

    // ---- 回合动作 ----

    /// 配牌：从牌山摸 13 张起手
    pub fn deal(&mut self, wall: &mut Wall) -> Result<(), SeatError> {
        if !self.hand.is_empty() {
            return Err(SeatError::AlreadyDealt);
        }
        for _ in 0..Hand::MAX_TILES {
            let tile = wall.draw()?;
            self.hand.add(tile)?;
        }
        Ok(())
    }

    /// 摸牌
    pub fn draw(&mut self, wall: &mut Wall) -> Result<Tile, SeatError> {
        if self.drawn.is_some() {
            return Err(SeatError::AlreadyDrawn);
        }
        let tile = wall.draw()?;
        self.drawn = Some(tile);
        Ok(tile)
    }

    /// 打牌
    ///
    /// 打摸到的那张直接入河；打手牌里的则与摸牌原子互换。
    /// 立直后只允许打摸到的牌。副露夺取回合后没有摸牌，
    /// 此时直接从手牌移除。
    pub fn discard(&mut self, tile: Tile) -> Result<(), SeatError> {
        if self.riichi && self.drawn != Some(tile) {
            return Err(SeatError::RiichiLocked);
        }
        if self.drawn == Some(tile) {
            self.drawn = None;
        } else {
            match self.drawn.take() {
                Some(drawn) => {
                    if let Err(e) = self.hand.replace(drawn, tile) {
                        // 替换失败时摸牌保持原状
                        self.drawn = Some(drawn);
                        return Err(e.into());
                    }
                }
                None => self.hand.remove(tile)?,
            }
        }
        self.discards.push(tile);
        Ok(())
    }

    /// 收回牌河最后一张（他家副露/荣和夺走弃牌时由 Table 调用）
    pub fn take_last_discard(&mut self) -> Option<Tile> {
        self.discards.pop()
    }

    // ---- 副露动作 ----

    /// 吃：用两张搭子与来牌组成顺子
    pub fn call_chii(&mut self, taken: Tile, partners: [Tile; 2]) -> Result<(), SeatError> {
        let mut tiles = [taken, partners[0], partners[1]];
        tiles.sort();
        let legal = tiles[0].suit().is_some()
            && tiles[0].suit() == tiles[1].suit()
            && tiles[1].suit() == tiles[2].suit()
            && tiles[0].next_in_suit() == Some(tiles[1])
            && tiles[1].next_in_suit() == Some(tiles[2]);
        if !legal {
            return Err(SeatError::InvalidMeld);
        }
        self.hand.remove_many(&partners)?;
        self.melds.add_run(taken, partners);
        Ok(())
    }

    /// 碰：用手中两张同种牌与来牌组成刻子
    pub fn call_pon(&mut self, taken: Tile, partners: [Tile; 2]) -> Result<(), SeatError> {
        if partners != [taken, taken] {
            return Err(SeatError::InvalidMeld);
        }
        self.hand.remove_many(&partners)?;
        self.melds.add_triplet(taken);
        Ok(())
    }

    /// 明杠：用手中三张同种牌与来牌组成杠
    pub fn call_kan(&mut self, taken: Tile, partners: [Tile; 3]) -> Result<(), SeatError> {
        if partners != [taken, taken, taken] {
            return Err(SeatError::InvalidMeld);
        }
        self.hand.remove_many(&partners)?;
        self.melds.add_quad(taken);
        Ok(())
    }

    /// 是否可以暗杠：手牌与摸牌合计持有四张同种牌
    pub fn can_declare_concealed_kan(&self, tile: Tile) -> bool {
        let held = self.hand.count(tile) as usize + usize::from(self.drawn == Some(tile));
        held == Tile::COPIES
    }

    /// 暗杠宣言
    pub fn declare_concealed_kan(&mut self, tile: Tile) -> Result<(), SeatError> {
        if !self.can_declare_concealed_kan(tile) {
            return Err(SeatError::QuadNotAllowed(tile));
        }
        if self.drawn == Some(tile) {
            self.drawn = None;
            self.hand.remove_many(&[tile, tile, tile])?;
        } else {
            // 四张都在手牌；摸牌（如有）并入手牌补位
            self.hand.remove_many(&[tile, tile, tile, tile])?;
            if let Some(drawn) = self.drawn.take() {
                self.hand.add(drawn)?;
            }
        }
        self.melds.add_concealed_quad(tile);
        Ok(())
    }

    /// 加杠宣言：把已碰的刻子升级为杠
    pub fn declare_added_kan(&mut self, tile: Tile) -> Result<(), SeatError> {
        if !self.melds.has_triplet(tile) {
            return Err(SeatError::QuadNotAllowed(tile));
        }
        if self.drawn == Some(tile) {
            self.drawn = None;
        } else {
            self.hand.remove(tile)?;
            // 摸牌并入手牌补位
            if let Some(drawn) = self.drawn.take() {
                self.hand.add(drawn)?;
            }
        }
        self.melds.upgrade_to_quad(tile)?;
        Ok(())
    }

    // ---- 判定 ----

    /// 自摸和了判定（没有摸牌时恒为否）
    pub fn can_tsumo(&mut self) -> bool {
        let drawn = self.drawn;
        self.checker.is_win(&self.hand, drawn)
    }

    /// 荣和判定：来牌并入手牌是否和牌
    pub fn can_ron(&mut self, tile: Tile) -> bool {
        self.checker.is_win(&self.hand, Some(tile))
    }

    /// 当前听牌集合（和了牌）
    pub fn waiting_tiles(&mut self) -> Vec<Tile> {
        self.checker.waiting_tiles(&self.hand)
    }

    /// 可宣言立直的打牌集合
    ///
    /// 条件：门前清（副露区无公开面子）、未立直、持有摸牌。
    /// 任一不满足返回空集。
    pub fn riichi_discards(&mut self) -> Vec<Tile> {
        if self.melds.is_open() || self.riichi {
            return Vec::new();
        }
        let drawn = match self.drawn {
            Some(t) => t,
            None => return Vec::new(),
        };
        self.checker.ready_discards(&self.hand, drawn)
    }

    /// 立直宣言：打出 `tile` 并锁定立直状态
    pub fn declare_riichi(&mut self, tile: Tile) -> Result<(), SeatError> {
        if !self.riichi_discards().contains(&tile) {
            return Err(SeatError::RiichiNotAllowed);
        }
        self.discard(tile)?;
        self.riichi = true;
        Ok(())
    }

    /// 对他家弃牌可做的全部响应
    ///
    /// `allow_chii` 仅对下家为真（吃只能吃上家）。
    /// 立直后手牌已锁定，副露后无牌可打，只给出荣和。
    pub fn call_options(&mut self, tile: Tile, allow_chii: bool) -> Vec<CallKind> {
        let mut options = Vec::new();
        if !self.riichi {
            if allow_chii && !self.hand.chii_partners(tile).is_empty() {
                options.push(CallKind::Chii);
            }
            if !self.hand.pon_partners(tile).is_empty() {
                options.push(CallKind::Pon);
            }
            if !self.hand.kan_partners(tile).is_empty() {
                options.push(CallKind::Kan);
            }
        }
        if self.can_ron(tile) {
            options.push(CallKind::Ron);
        }
        options
    }
}

impl Default for Seat {
    fn default() -> Self {
        Self::new()
    }
}
