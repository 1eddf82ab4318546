mod builder;

use rustc_hash::FxHashMap;

pub(crate) use builder::check_size;
pub use builder::{BuildStats, CancelToken, VocabBuilder};

/// 子词词表：词 -> 分数。
///
/// 分数只是排序用的元信息，不是概率。单字符条目在前，
/// 其后是按选中顺序排列的多字符条目。
#[derive(Clone, Debug, Default)]
pub struct Vocab {
    /// 按插入顺序保存 (词, 分数)
    entries: Vec<(String, f64)>,
    /// 词 -> entries 中的位置
    index: FxHashMap<String, usize>,
}

impl Vocab {
    /// 从已有条目构造词表，重复的词保留第一次的位置和最后一次的分数
    pub fn from_entries<S: Into<String>>(entries: impl IntoIterator<Item = (S, f64)>) -> Self {
        let mut ans = Self::default();
        for (text, score) in entries {
            ans.insert(text.into(), score);
        }
        ans
    }

    pub(crate) fn insert(&mut self, text: String, score: f64) {
        use std::collections::hash_map::Entry::{Occupied, Vacant};
        match self.index.entry(text) {
            Occupied(entry) => self.entries[*entry.get()].1 = score,
            Vacant(entry) => {
                self.entries.push((entry.key().clone(), score));
                entry.insert(self.entries.len() - 1);
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn contains(&self, text: &str) -> bool {
        self.index.contains_key(text)
    }

    pub fn score(&self, text: &str) -> Option<f64> {
        self.index.get(text).map(|&i| self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(text, score)| (text.as_str(), *score))
    }

    /// Multi-character entries with their score at the time they were selected,
    /// in selection order.
    ///
    /// Candidates with equal scores are taken in ascending text order, which
    /// does not depend on earlier rounds.
    pub fn learned(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.iter().filter(|(text, _)| text.chars().nth(1).is_some())
    }
}
