//! Subword vocabulary induction and segmentation.
//!
//! A vocabulary is grown greedily from a corpus of token counts, favouring
//! long and frequent substrings, then any token is split into the fewest
//! vocabulary pieces that concatenate back to it.

mod backend;
mod corpus;
mod error;
mod ngram;
mod segment;
mod tokenizer;
mod vocab;

pub mod revtok;

pub use backend::{Backend, Native};
pub use corpus::Corpus;
pub use error::{Error, Result};
pub use ngram::{NGram, NGrams, Utterance, overlap};
pub use segment::Segmenter;
pub use tokenizer::{Options, SubwordSegmenter, SubwordTokenizer};
pub use vocab::{BuildStats, CancelToken, Vocab, VocabBuilder};
