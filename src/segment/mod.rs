//! Minimum-piece segmentation of a token against a fixed vocabulary.

use crate::Vocab;
use patricia_tree::PatriciaMap;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub struct Segmenter {
    vocab: Arc<Vocab>,
    /// 多字符词的前缀树，值为词的字符数
    trie: PatriciaMap<usize>,
    /// 词 -> 已求得的切分，整个生命周期内不淘汰
    cache: RwLock<FxHashMap<String, Vec<String>>>,
}

impl Segmenter {
    pub fn new(vocab: impl Into<Arc<Vocab>>) -> Self {
        let vocab = vocab.into();
        let mut trie = PatriciaMap::new();
        for (text, _) in vocab.iter() {
            let n = text.chars().count();
            if n > 1 {
                trie.insert(text, n);
            }
        }
        Self {
            vocab,
            trie,
            cache: Default::default(),
        }
    }

    #[inline]
    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    /// Splits `token` into the fewest pieces, each a single character or a
    /// vocabulary entry. The pieces concatenate back to `token`.
    pub fn segment(&self, token: &str) -> Vec<String> {
        if token.is_empty() {
            return Vec::new();
        }
        if self.vocab.contains(token) {
            return vec![token.to_string()];
        }
        if let Some(pieces) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
        {
            return pieces.clone();
        }

        log::trace!("segmenting {token:?}");
        let pieces = self.decompose(token);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(token.to_string())
            .or_insert(pieces)
            .clone()
    }

    /// 并行切分一批词，结果与输入顺序一致
    pub fn segment_many<S: AsRef<str> + Sync>(&self, tokens: &[S]) -> Vec<Vec<String>> {
        tokens
            .par_iter()
            .map(|token| self.segment(token.as_ref()))
            .collect()
    }

    pub fn cache_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear()
    }

    /// 按前缀长度递增做松弛，只在片段数严格减少时替换，
    /// 因此片段数相同的切分保留最先找到的一个。
    fn decompose(&self, token: &str) -> Vec<String> {
        // 每个字符的字节起点，末尾补上总长
        let bounds = token
            .char_indices()
            .map(|(i, _)| i)
            .chain([token.len()])
            .collect::<Vec<_>>();
        let len = bounds.len() - 1;

        // best[j] = (覆盖前 j 个字符的最少片段数, 最后一个片段的起点)
        let mut best = vec![None::<(usize, usize)>; len + 1];
        best[0] = Some((0, 0));
        for i in 0..len {
            let Some((pieces, _)) = best[i] else {
                continue;
            };
            let rest = &token.as_bytes()[bounds[i]..];
            let ends = std::iter::once(1).chain(self.trie.common_prefixes(rest).map(|(_, &n)| n));
            for n in ends {
                let slot = &mut best[i + n];
                if slot.is_none_or(|(p, _)| pieces + 1 < p) {
                    *slot = Some((pieces + 1, i))
                }
            }
        }

        let mut ans = Vec::new();
        let mut j = len;
        while j > 0 {
            let Some((_, i)) = best[j] else {
                unreachable!("every prefix is reachable by single characters")
            };
            ans.push(token[bounds[i]..bounds[j]].to_string());
            j = i;
        }
        ans.reverse();
        ans
    }
}
