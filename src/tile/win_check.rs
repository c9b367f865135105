use super::{Hand, Tile};
use smallvec::SmallVec;
use std::collections::HashMap;

/// 和牌判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinResult {
    /// 是否和牌
    pub is_win: bool,
    /// 雀头（如果和牌）
    pub pair: Option<Tile>,
    /// 面子分解（顺子/刻子），已碰杠的面子不在其中
    pub groups: SmallVec<[Group; 4]>,
}

impl WinResult {
    fn miss() -> Self {
        Self {
            is_win: false,
            pair: None,
            groups: SmallVec::new(),
        }
    }
}

/// 面子（顺子或刻子）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    /// 顺子（以最小张标识，如 Run(2万) = 2-3-4万）
    Run { first: Tile },
    /// 刻子（三张相同牌）
    Triplet { tile: Tile },
}

/// 每种牌的数量表（按种类索引 0-33）
type Counts = [u8; Tile::KIND_COUNT];

/// 和牌判定器
///
/// 标准型：1 个雀头 + N 个面子（顺子/刻子），副露过的面子计入 N。
/// 分解采用递归回溯：对每个可能的雀头，在每一步同时尝试
/// 刻子提取和顺子提取——贪心的单次剥离会漏掉歧义牌型
/// （如同种四张既可作刻子也可拆入顺子），这里穷举全部提取顺序。
#[derive(Debug)]
pub struct WinChecker {
    /// 判定结果缓存（键为数量表的位打包，无碰撞）
    cache: HashMap<u128, bool>,
    /// 缓存上限，超过后整体清空
    max_cache_size: usize,
}

impl WinChecker {
    /// 创建新的判定器
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            max_cache_size: 1000,
        }
    }

    /// 判定「手牌 + 候选牌」是否构成和牌
    ///
    /// `extra` 为 None 时（如没有摸牌）直接判定为不和，
    /// 调用方不需要先做空值检查。
    ///
    /// 手牌张数随副露缩短（13/10/7/4/1），并入候选牌后
    /// 张数模 3 必须余 2，否则不可能和牌。
    pub fn is_win(&mut self, hand: &Hand, extra: Option<Tile>) -> bool {
        let extra = match extra {
            Some(t) => t,
            None => return false,
        };
        let counts = counts_of(hand, Some(extra));
        self.is_win_counts(&counts)
    }

    /// 判定并返回一个成功的分解（任选其一）
    pub fn check_win(&mut self, hand: &Hand, extra: Option<Tile>) -> WinResult {
        let extra = match extra {
            Some(t) => t,
            None => return WinResult::miss(),
        };
        let counts = counts_of(hand, Some(extra));
        let total: u8 = counts.iter().sum();
        if total % 3 != 2 {
            return WinResult::miss();
        }

        for head in 0..Tile::KIND_COUNT {
            if counts[head] < 2 {
                continue;
            }
            let mut rest = counts;
            rest[head] -= 2;
            let mut groups = SmallVec::new();
            if decompose(&mut rest, &mut groups) {
                return WinResult {
                    is_win: true,
                    pair: Tile::from_index(head),
                    groups,
                };
            }
        }
        WinResult::miss()
    }

    /// 当前的听牌（和了牌）集合
    ///
    /// 对 34 种牌逐一试插入（手中已有 4 张的除外），
    /// 返回能构成和牌的全部种类，去重后按理牌顺序排列。
    /// 多个雀头选择各自成立时取并集。
    pub fn waiting_tiles(&mut self, hand: &Hand) -> Vec<Tile> {
        let counts = counts_of(hand, None);
        self.waiting_of_counts(&counts)
    }

    /// 立直宣言牌集合
    ///
    /// 对 14 张（手牌 + 摸牌）中的每一张试打，剩余 13 张
    /// 仍有听牌的打法即为合法的立直宣言牌。
    pub fn ready_discards(&mut self, hand: &Hand, drawn: Tile) -> Vec<Tile> {
        let counts = counts_of(hand, Some(drawn));
        let mut out = Vec::new();
        for kind in 0..Tile::KIND_COUNT {
            if counts[kind] == 0 {
                continue;
            }
            let mut rest = counts;
            rest[kind] -= 1;
            if !self.waiting_of_counts(&rest).is_empty() {
                if let Some(tile) = Tile::from_index(kind) {
                    out.push(tile);
                }
            }
        }
        out
    }

    fn waiting_of_counts(&mut self, counts: &Counts) -> Vec<Tile> {
        let mut waits = Vec::new();
        for kind in 0..Tile::KIND_COUNT {
            if counts[kind] as usize >= Tile::COPIES {
                continue;
            }
            let mut test = *counts;
            test[kind] += 1;
            if self.is_win_counts(&test) {
                if let Some(tile) = Tile::from_index(kind) {
                    waits.push(tile);
                }
            }
        }
        waits
    }

    fn is_win_counts(&mut self, counts: &Counts) -> bool {
        let total: u8 = counts.iter().sum();
        if total % 3 != 2 {
            return false;
        }

        let key = counts_key(counts);
        if let Some(&hit) = self.cache.get(&key) {
            return hit;
        }

        let mut win = false;
        for head in 0..Tile::KIND_COUNT {
            if counts[head] < 2 {
                continue;
            }
            let mut rest = *counts;
            rest[head] -= 2;
            let mut groups = SmallVec::new();
            if decompose(&mut rest, &mut groups) {
                win = true;
                break;
            }
        }

        if self.cache.len() >= self.max_cache_size {
            self.cache.clear();
        }
        self.cache.insert(key, win);
        win
    }

    /// 清空缓存
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for WinChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// 递归回溯：把数量表完全分解为顺子/刻子
///
/// 每步取最小的非零种类，分别尝试从它提取刻子和顺子并递归；
/// 两条分支都走不通才失败。字牌只能组成刻子。
fn decompose(counts: &mut Counts, groups: &mut SmallVec<[Group; 4]>) -> bool {
    let first = match counts.iter().position(|&c| c > 0) {
        Some(i) => i,
        None => return true,
    };

    // 刻子分支
    if counts[first] >= 3 {
        counts[first] -= 3;
        if decompose(counts, groups) {
            counts[first] += 3;
            if let Some(tile) = Tile::from_index(first) {
                groups.push(Group::Triplet { tile });
            }
            return true;
        }
        counts[first] += 3;
    }

    // 顺子分支：仅数牌，且最小张的数字 <= 7
    let in_suit_pos = first % 9;
    if first < 27 && in_suit_pos <= 6 && counts[first + 1] > 0 && counts[first + 2] > 0 {
        counts[first] -= 1;
        counts[first + 1] -= 1;
        counts[first + 2] -= 1;
        if decompose(counts, groups) {
            counts[first] += 1;
            counts[first + 1] += 1;
            counts[first + 2] += 1;
            if let Some(tile) = Tile::from_index(first) {
                groups.push(Group::Run { first: tile });
            }
            return true;
        }
        counts[first] += 1;
        counts[first + 1] += 1;
        counts[first + 2] += 1;
    }

    false
}

fn counts_of(hand: &Hand, extra: Option<Tile>) -> Counts {
    let mut counts = [0u8; Tile::KIND_COUNT];
    for (tile, &n) in hand.counts() {
        counts[tile.to_index()] += n;
    }
    if let Some(tile) = extra {
        counts[tile.to_index()] += 1;
    }
    counts
}

/// 数量表的缓存键：每种牌占 3 位（数量 0-4），34 种共 102 位，
/// 装进一个 u128，不同的数量表键必不相同。
fn counts_key(counts: &Counts) -> u128 {
    let mut key = 0u128;
    for &c in counts {
        key = (key << 3) | c as u128;
    }
    key
}

/// 便捷函数：判定「手牌 + 候选牌」是否和牌
pub fn is_win(hand: &Hand, extra: Option<Tile>) -> bool {
    WinChecker::new().is_win(hand, extra)
}
