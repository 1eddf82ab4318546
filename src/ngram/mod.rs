//! Occurrence index: every substring of length ≥ 2 of every corpus token,
//! with the positions it occurs at and its frequency-weighted count.

mod overlap;

use crate::Corpus;
use rustc_hash::FxHashMap;

pub use overlap::overlap;

/// 词在索引中的序号
pub(crate) type UttId = u32;
/// n-gram 在索引中的序号
pub(crate) type NGramId = u32;

/// 语料中的一个不重复的词
#[derive(Clone, Debug)]
pub struct Utterance {
    text: String,
    /// 语料频数，构造后不变
    count: u64,
    /// 在此词中出现的所有 n-gram，按发现顺序，不重复
    ngrams: Vec<NGramId>,
}

impl Utterance {
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }
}

/// 长度至少为 2 的连续子串及其全部出现
#[derive(Clone, Debug)]
pub struct NGram {
    text: String,
    /// 字符数
    n: usize,
    /// 每个包含它的词中的起始位置（以字符计），按词序号升序
    utterances: Vec<(UttId, Vec<u32>)>,
    /// 加权计数，重叠折扣后可以是小数
    count: f64,
    /// count × (n - 1)，随 count 一起更新
    entropy: f64,
}

impl NGram {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            n: text.chars().count(),
            utterances: Vec::new(),
            count: 0.,
            entropy: 0.,
        }
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn count(&self) -> f64 {
        self.count
    }

    #[inline]
    pub fn entropy(&self) -> f64 {
        self.entropy
    }

    /// Updates the count and the derived entropy together.
    pub fn set_count(&mut self, count: f64) {
        self.count = count;
        self.entropy = count * (self.n - 1) as f64;
    }

    /// 记录一次出现。返回该词是否第一次被记录。
    fn add(&mut self, utt: UttId, freq: u64, i: u32) -> bool {
        self.set_count(self.count + freq as f64);
        match self.utterances.last_mut() {
            Some((last, offsets)) if *last == utt => {
                offsets.push(i);
                false
            }
            _ => {
                self.utterances.push((utt, vec![i]));
                true
            }
        }
    }

    pub(crate) fn utterance_ids(&self) -> impl Iterator<Item = UttId> + '_ {
        self.utterances.iter().map(|&(id, _)| id)
    }

    /// 在指定词中的起始位置，不出现时为空
    pub(crate) fn offsets(&self, utt: UttId) -> &[u32] {
        match self.utterances.binary_search_by_key(&utt, |&(id, _)| id) {
            Ok(i) => &self.utterances[i].1,
            Err(_) => &[],
        }
    }
}

/// 语料的 n-gram 全集
pub struct NGrams {
    utterances: Box<[Utterance]>,
    ngrams: Vec<NGram>,
    /// 文本到 n-gram 序号
    index: FxHashMap<String, NGramId>,
    /// 单字符计数，按 (计数降序, 字符升序)
    chars: Vec<(char, u64)>,
}

impl NGrams {
    /// Enumerates every substring of length 2..=N of every token of the corpus.
    ///
    /// A token of N characters yields O(N²) records, so long tokens are costly.
    pub fn from_corpus(corpus: &Corpus) -> Self {
        let mut chars = FxHashMap::<char, u64>::default();
        let utterances: Box<[Utterance]> = corpus
            .iter()
            .map(|(text, count)| {
                // 每个不同的词只贡献一次字符，与频数无关
                for c in text.chars() {
                    *chars.entry(c).or_default() += 1;
                }
                Utterance {
                    text: text.to_string(),
                    count,
                    ngrams: Vec::new(),
                }
            })
            .collect();
        let mut chars = chars.into_iter().collect::<Vec<_>>();
        chars.sort_unstable_by(|(a, na), (b, nb)| nb.cmp(na).then(a.cmp(b)));

        let mut ans = Self {
            utterances,
            ngrams: Vec::new(),
            index: FxHashMap::default(),
            chars,
        };
        for id in 0..ans.utterances.len() {
            ans.index_utterance(id as UttId);
        }
        ans
    }

    fn index_utterance(&mut self, utt: UttId) {
        let Utterance { text, count, .. } = &self.utterances[utt as usize];
        let (text, count) = (text.clone(), *count);
        // 每个字符的字节起点，末尾补上总长
        let bounds = text
            .char_indices()
            .map(|(i, _)| i)
            .chain([text.len()])
            .collect::<Vec<_>>();
        let len = bounds.len() - 1;

        let mut found = Vec::new();
        for i in 0..len.saturating_sub(1) {
            for n in 2..=len - i {
                let id = self.get_or_insert(&text[bounds[i]..bounds[i + n]]);
                if self.ngrams[id as usize].add(utt, count, i as u32) {
                    found.push(id);
                }
            }
        }
        self.utterances[utt as usize].ngrams = found;
    }

    fn get_or_insert(&mut self, text: &str) -> NGramId {
        if let Some(&id) = self.index.get(text) {
            return id;
        }
        let id = self.ngrams.len() as NGramId;
        self.ngrams.push(NGram::new(text));
        self.index.insert(text.to_string(), id);
        id
    }

    /// 不同 n-gram 的个数
    #[inline]
    pub fn len(&self) -> usize {
        self.ngrams.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ngrams.is_empty()
    }

    pub fn get(&self, text: &str) -> Option<&NGram> {
        self.index.get(text).map(|&id| &self.ngrams[id as usize])
    }

    pub fn iter(&self) -> impl Iterator<Item = &NGram> + '_ {
        self.ngrams.iter()
    }

    /// 单字符及其计数，按 (计数降序, 字符升序)
    #[inline]
    pub fn chars(&self) -> &[(char, u64)] {
        &self.chars
    }

    #[inline]
    pub(crate) fn ngram(&self, id: NGramId) -> &NGram {
        &self.ngrams[id as usize]
    }

    #[inline]
    pub(crate) fn ngram_mut(&mut self, id: NGramId) -> &mut NGram {
        &mut self.ngrams[id as usize]
    }

    #[inline]
    pub(crate) fn utterance(&self, id: UttId) -> &Utterance {
        &self.utterances[id as usize]
    }

    #[inline]
    pub(crate) fn ngrams_of(&self, id: UttId) -> &[NGramId] {
        &self.utterances[id as usize].ngrams
    }

    /// `a` 与 `b` 在词 `utt` 中的重叠程度，见 [`overlap`]
    pub(crate) fn overlap(&self, utt: UttId, a: NGramId, b: NGramId) -> f64 {
        let a = self.ngram(a);
        let b = self.ngram(b);
        overlap(a.n, a.offsets(utt), b.n, b.offsets(utt))
    }
}
