use std::path::Path;

use derive_new::new;
use tokenizers::Tokenizer;

use super::{SpecialTokens, SubwordTokenizer, TokenizerError};

/// Names of the reserved tokens in a pretrained vocabulary
#[derive(Debug, Clone, new)]
pub struct SpecialTokenNames {
    /// Sentence start, `[CLS]` for BERT
    pub start: String,
    /// Sentence end, `[SEP]` for BERT
    pub end: String,
    /// Padding
    pub pad: String,
    /// Masked position
    pub mask: String,
    /// Unknown piece
    pub unknown: String,
}

impl Default for SpecialTokenNames {
    fn default() -> Self {
        Self::new(
            super::CLS_TOKEN.to_string(),
            super::SEP_TOKEN.to_string(),
            super::PAD_TOKEN.to_string(),
            super::MASK_TOKEN.to_string(),
            super::UNK_TOKEN.to_string(),
        )
    }
}

/// A pretrained Hugging Face tokenizer used one word at a time
///
/// Words are encoded without special tokens, which the aligner adds itself.
#[derive(Clone)]
pub struct PretrainedTokenizer {
    tokenizer: Tokenizer,
    special_tokens: SpecialTokens,
}

impl PretrainedTokenizer {
    /// Wrap a tokenizer, resolving the reserved ids by name
    pub fn new(tokenizer: Tokenizer, names: &SpecialTokenNames) -> Result<Self, TokenizerError> {
        let id = |name: &String| {
            tokenizer
                .token_to_id(name)
                .ok_or_else(|| TokenizerError::MissingSpecialToken(name.clone()))
        };

        let special_tokens = SpecialTokens::new(
            id(&names.start)?,
            id(&names.end)?,
            id(&names.pad)?,
            id(&names.mask)?,
            id(&names.unknown)?,
        );

        Ok(Self {
            tokenizer,
            special_tokens,
        })
    }

    /// Load a `tokenizer.json` file with BERT's reserved token names
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TokenizerError> {
        let tokenizer =
            Tokenizer::from_file(path).map_err(|e| TokenizerError::Load(e.to_string()))?;

        Self::new(tokenizer, &SpecialTokenNames::default())
    }

    /// The wrapped tokenizer
    pub fn inner(&self) -> &Tokenizer {
        &self.tokenizer
    }
}

impl SubwordTokenizer for PretrainedTokenizer {
    fn tokenize_word(&self, word: &str) -> Result<Vec<u32>, TokenizerError> {
        let encoding = self
            .tokenizer
            .encode(word, false)
            .map_err(|e| TokenizerError::Encode {
                word: word.to_string(),
                message: e.to_string(),
            })?;

        Ok(encoding.get_ids().to_vec())
    }

    fn id_to_token(&self, id: u32) -> Option<String> {
        self.tokenizer.id_to_token(id)
    }

    fn special_tokens(&self) -> &SpecialTokens {
        &self.special_tokens
    }
}
