//! 语料：词到频数的映射

use crate::error::{Error, Result};
use std::{collections::BTreeMap, fmt::Display};

/// 训练语料，按词文本排序保存以保证构建过程可复现
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Corpus {
    entries: Box<[(String, u64)]>,
}

impl Corpus {
    /// 从 (词, 频数) 构造语料，重复的词频数相加。
    ///
    /// 任何一个频数为负、无法转换为 `u64` 或相加后溢出时立即失败，不做任何计算。
    pub fn new<I, S, C>(counts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, C)>,
        S: Into<String>,
        C: TryInto<u64> + Copy + Display,
    {
        use std::collections::btree_map::Entry::{Occupied, Vacant};

        let mut map = BTreeMap::<String, u64>::new();
        for (text, count) in counts {
            let text = text.into();
            let Ok(n) = TryInto::<u64>::try_into(count) else {
                return Err(Error::InvalidFrequency {
                    token: text,
                    value: count.to_string(),
                });
            };
            match map.entry(text) {
                Vacant(entry) => {
                    entry.insert(n);
                }
                Occupied(mut entry) => match entry.get().checked_add(n) {
                    Some(sum) => *entry.get_mut() = sum,
                    None => {
                        return Err(Error::InvalidFrequency {
                            value: format!("{} + {count}", entry.get()),
                            token: entry.remove_entry().0,
                        });
                    }
                },
            }
        }
        Ok(Self {
            entries: map.into_iter().collect(),
        })
    }

    /// 统计词序列中每个词出现的次数
    pub fn count<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = BTreeMap::<String, u64>::new();
        for text in tokens {
            *map.entry(text.into()).or_default() += 1;
        }
        Self {
            entries: map.into_iter().collect(),
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

    /// 按文本升序遍历 (词, 频数)
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(text, n)| (text.as_str(), *n))
    }

    pub fn frequency(&self, text: &str) -> Option<u64> {
        self.entries
            .binary_search_by(|(t, _)| t.as_str().cmp(text))
            .ok()
            .map(|i| self.entries[i].1)
    }
}
