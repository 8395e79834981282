//! The subword tokenizer seen by the aligner and the masked language model helpers

use derive_new::new;

/// Tokenizers backed by Hugging Face `tokenizer.json` files
pub mod hugging_face;

pub use hugging_face::PretrainedTokenizer;

/// Padding marker
pub const PAD_TOKEN: &str = "[PAD]";

/// Unknown piece marker
pub const UNK_TOKEN: &str = "[UNK]";

/// Sentence start marker
pub const CLS_TOKEN: &str = "[CLS]";

/// Sentence end marker
pub const SEP_TOKEN: &str = "[SEP]";

/// Masked language model marker
pub const MASK_TOKEN: &str = "[MASK]";

/// Reserved ids of a tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct SpecialTokens {
    /// Sentence start
    pub start: u32,

    /// Sentence end
    pub end: u32,

    /// Padding
    pub pad: u32,

    /// Masked position
    pub mask: u32,

    /// Unknown piece
    pub unknown: u32,
}

impl SpecialTokens {
    /// True if the id is reserved
    pub fn contains(&self, id: u32) -> bool {
        [self.start, self.end, self.pad, self.mask, self.unknown].contains(&id)
    }
}

/// A tokenizer that splits single words into subword ids
pub trait SubwordTokenizer: Send + Sync {
    /// Split one word into subword ids, in order
    fn tokenize_word(&self, word: &str) -> Result<Vec<u32>, TokenizerError>;

    /// The readable form of an id
    fn id_to_token(&self, id: u32) -> Option<String>;

    /// The reserved ids
    fn special_tokens(&self) -> &SpecialTokens;

    /// Readable forms for a sequence of ids, with `[UNK]` for ids the tokenizer doesn't know
    fn ids_to_tokens(&self, ids: &[u32]) -> Vec<String> {
        ids.iter()
            .map(|&id| self.id_to_token(id).unwrap_or_else(|| UNK_TOKEN.to_string()))
            .collect()
    }
}

/// Tokenizer Error
#[derive(thiserror::Error, Debug)]
pub enum TokenizerError {
    /// The tokenizer could not be loaded
    #[error("unable to load tokenizer: {0}")]
    Load(String),

    /// The tokenizer failed on a word
    #[error("unable to tokenize {word:?}: {message}")]
    Encode {
        /// The word being tokenized
        word: String,
        /// The underlying error
        message: String,
    },

    /// A reserved token is absent from the vocabulary
    #[error("special token {0} is not in the vocabulary")]
    MissingSpecialToken(String),
}
