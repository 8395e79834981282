/// Subword pieces and merges
pub mod piece;

/// Ordered piece sets
pub mod vocabulary;

/// Byte-pair-encoding training
pub mod trainer;

/// Tokenization with a frozen vocabulary
pub mod tokenizer;

pub use piece::{Merge, Piece};
pub use tokenizer::BpeTokenizer;
pub use trainer::{Trainer, TrainerConfig, Training};
pub use vocabulary::Vocabulary;

/// Vocabulary Error
#[derive(thiserror::Error, Debug)]
pub enum VocabError {
    /// Reading or writing a tokenizer file failed
    #[error("unable to access tokenizer file: {0}")]
    Io(#[from] std::io::Error),

    /// A tokenizer file could not be parsed
    #[error("invalid tokenizer file: {0}")]
    Json(#[from] serde_json::Error),

    /// A tokenizer file lists special tokens this crate does not produce
    #[error("unexpected special tokens {0:?}")]
    SpecialTokens(Vec<String>),
}
