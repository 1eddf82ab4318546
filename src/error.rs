//! Error types for vocabulary construction and segmentation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// 语料中的频数为负或无法表示为非负整数
    #[error("invalid frequency {value} for token {token:?}")]
    InvalidFrequency { token: String, value: String },

    /// 词表容量装不下全部单字符
    #[error(
        "vocabulary size {requested} is smaller than the {minimum} distinct characters of the corpus"
    )]
    VocabTooSmall { requested: usize, minimum: usize },

    #[error("vocabulary construction cancelled after {selected} selections")]
    Cancelled { selected: usize },

    /// 外部加速后端不可用或调用失败
    #[error("backend {name} failed: {reason}")]
    Backend { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
