//! End-to-end subword tokenization: reversible tokenization of raw text,
//! one vocabulary build over the token counts, segmentation of every token.

use crate::{
    CancelToken, Corpus, Segmenter, Vocab,
    backend::{self, Backend, Native},
    error::{Error, Result},
    revtok::{self, TokenizeOptions},
    vocab::check_size,
};

#[derive(Clone, Debug)]
pub struct Options {
    /// 词表容量上限，包括全部单字符
    pub max_size: usize,
    /// 不探测加速后端，总是使用本地实现
    pub force_native: bool,
    /// 加速后端可用时，由它负责切分
    pub accelerated_segmentation: bool,
    /// 切分文本时使用的分词选项，训练时总是去除大写
    pub tokenize: TokenizeOptions,
    pub cancel: CancelToken,
}

impl Options {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            force_native: false,
            accelerated_segmentation: false,
            tokenize: TokenizeOptions::default(),
            cancel: CancelToken::new(),
        }
    }
}

/// 词表构建与切分的入口，按启动时的探测结果选择后端
pub struct SubwordSegmenter {
    backend: Box<dyn Backend>,
    segmenter: Segmenter,
    accelerated_segmentation: bool,
}

impl SubwordSegmenter {
    pub fn new(corpus: &Corpus, options: &Options) -> Result<Self> {
        Self::with_backend(corpus, options, None)
    }

    pub fn with_backend(
        corpus: &Corpus,
        options: &Options,
        accelerated: Option<Box<dyn Backend>>,
    ) -> Result<Self> {
        check_size(corpus, options.max_size)?;

        let mut backend: Box<dyn Backend> = if options.force_native {
            Box::new(Native)
        } else {
            backend::select(accelerated)
        };
        let vocab = match backend.build_vocab(corpus, options.max_size, &options.cancel) {
            Ok(vocab) => vocab,
            Err(e) if backend.is_native() => return Err(e),
            Err(e) => {
                log::warn!("{e}, falling back to native implementation");
                backend = Box::new(Native);
                backend.build_vocab(corpus, options.max_size, &options.cancel)?
            }
        };

        Ok(Self {
            backend,
            segmenter: Segmenter::new(vocab),
            accelerated_segmentation: options.accelerated_segmentation,
        })
    }

    #[inline]
    pub fn vocab(&self) -> &Vocab {
        self.segmenter.vocab()
    }

    /// 本地切分器，本地后端下所有切分都经过它的缓存
    #[inline]
    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    #[inline]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn segment(&self, token: &str) -> Vec<String> {
        if self.accelerated_segmentation && !self.backend.is_native() {
            match self.accelerated(token) {
                Ok(pieces) => return pieces,
                Err(e) => log::warn!("{e}, falling back to native segmentation"),
            }
        }
        self.segmenter.segment(token)
    }

    /// 切分一串词并把结果首尾相接
    pub fn segment_all<S: AsRef<str>>(&self, tokens: impl IntoIterator<Item = S>) -> Vec<String> {
        tokens
            .into_iter()
            .flat_map(|token| self.segment(token.as_ref()))
            .collect()
    }

    fn accelerated(&self, token: &str) -> Result<Vec<String>> {
        let pieces = self.backend.segment(self.vocab(), token)?;
        if pieces.concat() == token {
            Ok(pieces)
        } else {
            Err(Error::Backend {
                name: self.backend.name().into(),
                reason: format!("segmentation of {token:?} does not reconstruct it"),
            })
        }
    }
}

pub struct SubwordTokenizer {
    segmenter: SubwordSegmenter,
    tokenize: TokenizeOptions,
}

impl SubwordTokenizer {
    /// Learns a vocabulary from the decapitalised tokens of `text`.
    pub fn new(text: &str, options: &Options) -> Result<Self> {
        Self::with_backend(text, options, None)
    }

    pub fn with_backend(
        text: &str,
        options: &Options,
        accelerated: Option<Box<dyn Backend>>,
    ) -> Result<Self> {
        let corpus = Corpus::count(revtok::tokenize(
            text,
            TokenizeOptions {
                decapitalize: true,
                ..options.tokenize
            },
        ));
        Ok(Self {
            segmenter: SubwordSegmenter::with_backend(&corpus, options, accelerated)?,
            tokenize: options.tokenize,
        })
    }

    #[inline]
    pub fn segmenter(&self) -> &SubwordSegmenter {
        &self.segmenter
    }

    /// 文本 -> 子词序列
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.segmenter
            .segment_all(revtok::tokenize(text, self.tokenize))
    }

    /// 子词序列 -> 文本
    pub fn detokenize<S: AsRef<str>>(&self, pieces: impl IntoIterator<Item = S>) -> String {
        revtok::detokenize(pieces)
    }
}

#[cfg(test)]
mod tests {
    use super::{Options, SubwordSegmenter, SubwordTokenizer};
    use crate::{
        Corpus, Error,
        backend::tests::Mock,
        revtok::{self, TokenizeOptions},
    };

    const TEXT: &str = "The quick brown fox jumps over the lazy dog. \
                        The lazy dog sleeps; the quick fox jumps again, \
                        and again, over the sleeping dog.";

    #[test]
    fn tokenizes_reversibly() {
        let tokenizer = SubwordTokenizer::new(TEXT, &Options::new(80)).unwrap();
        assert_eq!(tokenizer.segmenter().backend_name(), "native");
        assert!(tokenizer.segmenter().vocab().len() <= 80);

        for text in [
            TEXT,
            "The dog jumps over the quick fox!",
            "Unseen words: zebra, 42.",
            "a b c d",
        ] {
            let pieces = tokenizer.tokenize(text);
            assert_eq!(tokenizer.detokenize(&pieces), text);
            // 空格在相邻两个词之间各分一半，所以按词的字符数而不是原文计
            let chars = revtok::tokenize(text, TokenizeOptions::default())
                .iter()
                .map(|token| token.chars().count())
                .sum::<usize>();
            assert!(pieces.len() <= chars);
            if text == TEXT {
                assert!(pieces.len() < chars);
            }
        }
    }

    #[test]
    fn decapitalized_application() {
        let options = Options {
            tokenize: TokenizeOptions {
                decapitalize: true,
                ..Default::default()
            },
            ..Options::new(80)
        };
        let tokenizer = SubwordTokenizer::new(TEXT, &options).unwrap();
        let pieces = tokenizer.tokenize("The Lazy Fox");
        assert_eq!(tokenizer.detokenize(&pieces), "The Lazy Fox");
    }

    #[test]
    fn too_small_fails_fast() {
        assert!(matches!(
            SubwordTokenizer::new(TEXT, &Options::new(5)),
            Err(Error::VocabTooSmall { requested: 5, .. })
        ));
    }

    #[test]
    fn accelerated_backend_is_used() {
        let corpus = Corpus::new([("abab", 3u64)]).unwrap();
        let options = Options {
            accelerated_segmentation: true,
            ..Options::new(3)
        };
        let segmenter =
            SubwordSegmenter::with_backend(&corpus, &options, Some(Box::new(Mock::working())))
                .unwrap();
        assert_eq!(segmenter.backend_name(), "mock");
        assert!(segmenter.vocab().contains("zz"));
        // the mock splits into characters
        assert_eq!(segmenter.segment("zzz"), ["z", "z", "z"]);
    }

    #[test]
    fn failing_backend_falls_back() {
        let corpus = Corpus::new([("abab", 3u64)]).unwrap();
        let options = Options::new(3);

        let segmenter = SubwordSegmenter::with_backend(
            &corpus,
            &options,
            Some(Box::new(Mock {
                build_fails: true,
                ..Mock::working()
            })),
        )
        .unwrap();
        assert_eq!(segmenter.backend_name(), "native");
        assert_eq!(segmenter.segment("ababa"), ["abab", "a"]);

        let options = Options {
            accelerated_segmentation: true,
            ..Options::new(3)
        };
        let segmenter = SubwordSegmenter::with_backend(
            &corpus,
            &options,
            Some(Box::new(Mock {
                segment_fails: true,
                ..Mock::working()
            })),
        )
        .unwrap();
        assert_eq!(segmenter.backend_name(), "mock");
        assert_eq!(segmenter.segment("zzz"), ["z", "zz"]);
    }

    #[test]
    fn force_native_skips_probe() {
        let corpus = Corpus::new([("abab", 3u64)]).unwrap();
        let options = Options {
            force_native: true,
            ..Options::new(3)
        };
        let segmenter =
            SubwordSegmenter::with_backend(&corpus, &options, Some(Box::new(Mock::working())))
                .unwrap();
        assert_eq!(segmenter.backend_name(), "native");
        assert_eq!(
            segmenter.segment_all(["abab", "ba", "x"]),
            ["abab", "b", "a", "x"]
        );
    }

    #[test]
    fn native_segmentation_is_cached() {
        let corpus = Corpus::new([("abab", 3u64)]).unwrap();
        let options = Options {
            accelerated_segmentation: true,
            ..Options::new(3)
        };
        let segmenter = SubwordSegmenter::new(&corpus, &options).unwrap();
        assert_eq!(segmenter.backend_name(), "native");
        for _ in 0..3 {
            assert_eq!(segmenter.segment("ababa"), ["abab", "a"]);
        }
        assert_eq!(segmenter.segmenter().cache_len(), 1);
    }

    #[test]
    fn empty_corpus() {
        let segmenter = SubwordSegmenter::new(&Corpus::default(), &Options::new(0)).unwrap();
        assert!(segmenter.vocab().is_empty());
        assert_eq!(segmenter.segment("abc"), ["a", "b", "c"]);
        assert!(segmenter.segment("").is_empty());
    }
}
