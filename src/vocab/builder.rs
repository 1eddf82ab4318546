//! Greedy entropy-driven vocabulary construction.
//!
//! Every round selects the candidate with the largest `count × (n - 1)`,
//! then discounts the count of every other n-gram sharing a token with it
//! by `frequency × overlap`. Ties go to the lexicographically smaller text.

use super::Vocab;
use crate::{
    Corpus,
    error::{Error, Result},
    ngram::{NGramId, NGrams, UttId},
};
use rustc_hash::FxHashSet;
use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering::Relaxed},
    },
};

/// 构建过程的取消标志，在每一轮选择之前检查
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Relaxed)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Relaxed)
    }
}

/// 构建过程的统计信息，仅用于诊断
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// 枚举出的候选 n-gram 总数
    pub candidates: usize,
    /// 选入词表的 n-gram 数
    pub selected: usize,
    /// 因重叠折扣由非负变为负的计数次数
    pub negative_counts: usize,
}

/// 堆中的候选项。
///
/// 计数只会下降，所以堆中记录的分数不小于真实分数；
/// 弹出时分数过期的项以当前分数重新入堆。
#[derive(Clone, Copy, Debug)]
struct HeapItem {
    entropy: f64,
    /// 文本的字典序名次，越小越优先
    rank: u32,
    id: NGramId,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.entropy
            .total_cmp(&other.entropy)
            .then_with(|| other.rank.cmp(&self.rank))
    }
}

/// 单字符必须全部进入词表，容量不足时在任何计算之前失败
pub(crate) fn check_size(corpus: &Corpus, max_size: usize) -> Result<()> {
    let minimum = corpus
        .iter()
        .flat_map(|(text, _)| text.chars())
        .collect::<FxHashSet<_>>()
        .len();
    if max_size < minimum {
        Err(Error::VocabTooSmall {
            requested: max_size,
            minimum,
        })
    } else {
        Ok(())
    }
}

pub struct VocabBuilder {
    ngrams: NGrams,
    vocab: Vocab,
    /// 每个未选中的候选在堆中恰有一项
    heap: BinaryHeap<HeapItem>,
    /// 已选入词表的 n-gram
    selected: Box<[bool]>,
    stats: BuildStats,
}

impl VocabBuilder {
    /// Seeds the vocabulary with every character of the corpus and
    /// enumerates the candidate pool.
    pub fn new(corpus: &Corpus) -> Self {
        let ngrams = NGrams::from_corpus(corpus);

        let vocab = Vocab::from_entries(
            ngrams
                .chars()
                .iter()
                .map(|&(c, n)| (c.to_string(), n as f64)),
        );

        let mut order = (0..ngrams.len() as NGramId).collect::<Vec<_>>();
        order.sort_unstable_by(|&a, &b| ngrams.ngram(a).text().cmp(ngrams.ngram(b).text()));
        let heap = order
            .into_iter()
            .enumerate()
            .map(|(rank, id)| HeapItem {
                entropy: ngrams.ngram(id).entropy(),
                rank: rank as _,
                id,
            })
            .collect();

        Self {
            selected: vec![false; ngrams.len()].into(),
            stats: BuildStats {
                candidates: ngrams.len(),
                ..Default::default()
            },
            ngrams,
            vocab,
            heap,
        }
    }

    /// Builds a vocabulary of at most `max_size` entries, single characters included.
    pub fn build(
        corpus: &Corpus,
        max_size: usize,
        cancel: &CancelToken,
    ) -> Result<(Vocab, BuildStats)> {
        check_size(corpus, max_size)?;
        let mut builder = Self::new(corpus);
        log::info!(
            "building subword vocab: {} tokens, {} chars, {} candidates",
            corpus.len(),
            builder.vocab.len(),
            builder.stats.candidates,
        );
        builder.run(max_size, cancel)?;
        Ok(builder.finish())
    }

    /// Keeps selecting until the vocabulary holds `max_size` entries or the
    /// pool is empty. Cancellation is checked before every selection.
    pub fn run(&mut self, max_size: usize, cancel: &CancelToken) -> Result<()> {
        while self.vocab.len() < max_size {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    selected: self.stats.selected,
                });
            }
            if !self.step() {
                break;
            }
        }
        log::info!(
            "subword vocab built: {} entries, {} selected",
            self.vocab.len(),
            self.stats.selected,
        );
        Ok(())
    }

    #[inline]
    pub fn finish(self) -> (Vocab, BuildStats) {
        (self.vocab, self.stats)
    }

    /// Selects one n-gram into the vocabulary. Returns `false` once the pool is empty.
    pub fn step(&mut self) -> bool {
        let Some(best) = self.pop_best() else {
            return false;
        };
        self.selected[best as usize] = true;

        let utterances = self.ngrams.ngram(best).utterance_ids().collect::<Vec<_>>();
        for utt in utterances {
            self.discount(utt, best)
        }

        let ngram = self.ngrams.ngram(best);
        log::debug!("selected {:?}: {}", ngram.text(), ngram.entropy());
        self.vocab.insert(ngram.text().to_string(), ngram.entropy());
        self.stats.selected += 1;
        true
    }

    /// 在词 `utt` 中，按与 `best` 的重叠程度折扣其他候选的计数
    fn discount(&mut self, utt: UttId, best: NGramId) {
        let freq = self.ngrams.utterance(utt).count() as f64;
        for k in 0..self.ngrams.ngrams_of(utt).len() {
            let id = self.ngrams.ngrams_of(utt)[k];
            if id == best || self.selected[id as usize] {
                continue;
            }
            let overlap = self.ngrams.overlap(utt, id, best);
            debug_assert!((0. ..=1.).contains(&overlap));
            if overlap == 0. {
                continue;
            }

            let ngram = self.ngrams.ngram_mut(id);
            let before = ngram.count();
            ngram.set_count(before - freq * overlap);
            debug_assert!(ngram.entropy().is_finite());
            // 不截断为 0，负计数是可接受的近似
            if before >= 0. && ngram.count() < 0. {
                self.stats.negative_counts += 1;
                log::debug!("count of {:?} dropped below zero", ngram.text());
            }
        }
    }

    fn pop_best(&mut self) -> Option<NGramId> {
        while let Some(item) = self.heap.pop() {
            let entropy = self.ngrams.ngram(item.id).entropy();
            if entropy == item.entropy {
                return Some(item.id);
            }
            debug_assert!(entropy < item.entropy);
            self.heap.push(HeapItem { entropy, ..item });
        }
        None
    }

    #[inline]
    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    #[inline]
    pub fn ngrams(&self) -> &NGrams {
        &self.ngrams
    }

    #[inline]
    pub fn stats(&self) -> BuildStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelToken, VocabBuilder};
    use crate::{Corpus, Error};

    fn banana() -> Corpus {
        Corpus::new([("banana", 5u64)]).unwrap()
    }

    #[test]
    fn selects_by_entropy() {
        let corpus = banana();
        let best = VocabBuilder::new(&corpus)
            .ngrams()
            .iter()
            .map(|ngram| ngram.entropy())
            .fold(f64::MIN, f64::max);

        let (vocab, stats) = VocabBuilder::build(&corpus, 8, &CancelToken::new()).unwrap();
        assert_eq!(vocab.len(), 8);
        assert_eq!(stats.selected, 5);
        assert_eq!(stats.candidates, 12);

        let learned = vocab.learned().collect::<Vec<_>>();
        assert_eq!(learned[0], ("banana", best));
        assert_eq!(learned[0].1, 25.);
        // "ana" keeps 5 after the first discount, "an" and "na" tie at 1.25 after the second
        assert_eq!(learned[1], ("ana", 10.));
        assert_eq!(learned[2], ("an", 1.25));
    }

    #[test]
    fn discounting_can_go_negative() {
        let (_, stats) = VocabBuilder::build(&banana(), 8, &CancelToken::new()).unwrap();
        assert!(stats.negative_counts > 0);
    }

    #[test]
    fn seeds_chars_first() {
        let (vocab, _) = VocabBuilder::build(&banana(), 3, &CancelToken::new()).unwrap();
        assert_eq!(
            vocab.iter().collect::<Vec<_>>(),
            [("a", 3.), ("n", 2.), ("b", 1.)]
        );
    }

    #[test]
    fn overlapping_tokens() {
        let corpus = Corpus::new([("aa", 10u64), ("aaa", 5)]).unwrap();
        let (vocab, _) = VocabBuilder::build(&corpus, 2, &CancelToken::new()).unwrap();
        assert_eq!(vocab.learned().collect::<Vec<_>>(), [("aa", 20.)]);
    }

    #[test]
    fn ties_go_to_smaller_text() {
        let corpus = Corpus::new([("cd", 1u64), ("ab", 1)]).unwrap();
        let (vocab, _) = VocabBuilder::build(&corpus, 6, &CancelToken::new()).unwrap();
        assert_eq!(vocab.learned().collect::<Vec<_>>(), [("ab", 1.), ("cd", 1.)]);
    }

    #[test]
    fn deterministic() {
        let corpus = Corpus::new([
            ("lower", 5u64),
            ("lowest", 2),
            ("newer", 6),
            ("wider", 3),
            ("new", 2),
        ])
        .unwrap();
        let run = || {
            let (vocab, _) = VocabBuilder::build(&corpus, 20, &CancelToken::new()).unwrap();
            vocab
                .iter()
                .map(|(text, score)| (text.to_string(), score.to_bits()))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn larger_size_learns_more() {
        let corpus = Corpus::new([("lower", 5u64), ("newest", 6), ("widest", 3)]).unwrap();
        let small = VocabBuilder::build(&corpus, 14, &CancelToken::new()).unwrap().0;
        let large = VocabBuilder::build(&corpus, 20, &CancelToken::new()).unwrap().0;
        assert!(large.learned().count() >= small.learned().count());
        for (text, _) in small.iter().filter(|(t, _)| t.chars().count() == 1) {
            assert!(large.contains(text));
        }
    }

    #[test]
    fn stops_when_pool_is_empty() {
        let corpus = Corpus::new([("ab", 1u64)]).unwrap();
        let (vocab, stats) = VocabBuilder::build(&corpus, 100, &CancelToken::new()).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(stats.selected, 1);
    }

    #[test]
    fn empty_corpus() {
        let corpus = Corpus::default();
        let (vocab, _) = VocabBuilder::build(&corpus, 0, &CancelToken::new()).unwrap();
        assert!(vocab.is_empty());
    }

    #[test]
    fn too_small() {
        match VocabBuilder::build(&banana(), 2, &CancelToken::new()) {
            Err(Error::VocabTooSmall { requested, minimum }) => {
                assert_eq!(requested, 2);
                assert_eq!(minimum, 3);
            }
            _ => panic!("expected VocabTooSmall"),
        }
    }

    #[test]
    fn cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            VocabBuilder::build(&banana(), 8, &cancel),
            Err(Error::Cancelled { selected: 0 })
        ));
    }

    #[test]
    fn cancelled_midway() {
        let cancel = CancelToken::new();
        let mut builder = VocabBuilder::new(&banana());
        assert!(builder.step());
        assert!(builder.step());
        cancel.cancel();
        assert!(matches!(
            builder.run(8, &cancel),
            Err(Error::Cancelled { selected: 2 })
        ));
        // 取消后词表保持已选中的部分
        assert_eq!(builder.vocab().len(), 5);
        assert_eq!(builder.stats().selected, 2);
    }

    #[test]
    fn resumes_after_manual_steps() {
        let corpus = banana();
        let mut builder = VocabBuilder::new(&corpus);
        assert!(builder.step());
        builder.run(8, &CancelToken::new()).unwrap();
        let (vocab, stats) = builder.finish();

        let (expected, _) = VocabBuilder::build(&corpus, 8, &CancelToken::new()).unwrap();
        assert_eq!(stats.selected, 5);
        assert_eq!(
            vocab.iter().collect::<Vec<_>>(),
            expected.iter().collect::<Vec<_>>()
        );
    }
}
