//! Engines that build vocabularies and segment tokens.
//!
//! [`Native`] is always available. An accelerated engine may be plugged in
//! through the same trait; it is probed once at startup and any failure,
//! at probe or at call time, falls back to [`Native`] with a warning.

use crate::{CancelToken, Corpus, Segmenter, Vocab, VocabBuilder, error::Result};

pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    /// 启动时的可用性探测
    fn probe(&self) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn is_native(&self) -> bool {
        false
    }

    fn build_vocab(
        &self,
        corpus: &Corpus,
        max_size: usize,
        cancel: &CancelToken,
    ) -> Result<Vocab>;

    /// 切分结果必须是最少片段数，且拼接后等于 `token`
    fn segment(&self, vocab: &Vocab, token: &str) -> Result<Vec<String>>;
}

/// 本地实现
#[derive(Clone, Copy, Debug, Default)]
pub struct Native;

impl Backend for Native {
    #[inline]
    fn name(&self) -> &str {
        "native"
    }

    #[inline]
    fn is_native(&self) -> bool {
        true
    }

    fn build_vocab(
        &self,
        corpus: &Corpus,
        max_size: usize,
        cancel: &CancelToken,
    ) -> Result<Vocab> {
        VocabBuilder::build(corpus, max_size, cancel).map(|(vocab, _)| vocab)
    }

    /// 契约的参照实现：每次调用都重建前缀树，不保留缓存。
    ///
    /// [`SubwordSegmenter`](crate::SubwordSegmenter) 在本地后端下直接使用
    /// 自己持有的 [`Segmenter`]，不经过这里。
    fn segment(&self, vocab: &Vocab, token: &str) -> Result<Vec<String>> {
        Ok(Segmenter::new(vocab.clone()).segment(token))
    }
}

/// Picks the accelerated backend if it passes its probe, [`Native`] otherwise.
pub fn select(accelerated: Option<Box<dyn Backend>>) -> Box<dyn Backend> {
    match accelerated {
        Some(backend) => match backend.probe() {
            Ok(()) => {
                log::info!("using {} backend", backend.name());
                backend
            }
            Err(e) => {
                log::warn!("{e}, falling back to native implementation");
                Box::new(Native)
            }
        },
        None => Box::new(Native),
    }
}
