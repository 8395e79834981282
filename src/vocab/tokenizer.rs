use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::tokenization::{self, SpecialTokens, SubwordTokenizer, TokenizerError};

use super::{Merge, Piece, Training, VocabError, Vocabulary};

/// Special tokens in id order, ahead of the learned pieces
pub static SPECIAL_TOKENS: [&str; 5] = [
    tokenization::PAD_TOKEN,
    tokenization::UNK_TOKEN,
    tokenization::CLS_TOKEN,
    tokenization::SEP_TOKEN,
    tokenization::MASK_TOKEN,
];

/// On-disk layout of a trained tokenizer
#[derive(Serialize, Deserialize)]
struct TokenizerFile {
    special_tokens: Vec<String>,
    vocab: Vocabulary,
    merges: Vec<Merge>,
}

/// A frozen vocabulary with its learned merges
///
/// Words are split into characters and the merges are replayed in the order they were learned.
/// Special tokens take the first ids, followed by the pieces in vocabulary order.
#[derive(Debug, Clone)]
pub struct BpeTokenizer {
    vocab: Vocabulary,
    merges: Vec<Merge>,

    /// (left, right) vocabulary positions -> (rank, merged position)
    ranks: HashMap<(usize, usize), (usize, usize)>,

    special_tokens: SpecialTokens,
}

impl BpeTokenizer {
    /// Freeze a vocabulary and the merges that built it
    pub fn new(vocab: Vocabulary, merges: Vec<Merge>) -> Self {
        let ranks = merges
            .iter()
            .enumerate()
            .filter_map(|(rank, merge)| {
                let left = vocab.position(&merge.left)?;
                let right = vocab.position(&merge.right)?;
                let merged = vocab.position(&merge.merged())?;

                Some(((left, right), (rank, merged)))
            })
            .collect();

        let special_tokens = SpecialTokens {
            pad: 0,
            unknown: 1,
            start: 2,
            end: 3,
            mask: 4,
        };

        Self {
            vocab,
            merges,
            ranks,
            special_tokens,
        }
    }

    /// The vocabulary pieces
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// The merges in learned order
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Total number of ids, special tokens included
    pub fn vocab_size(&self) -> usize {
        SPECIAL_TOKENS.len() + self.vocab.len()
    }

    /// Split a word into pieces by replaying the learned merges
    ///
    /// The texts of the returned pieces always concatenate back to the word, including characters
    /// that are missing from the vocabulary.
    pub fn tokenize(&self, word: &str) -> Vec<Piece> {
        let mut symbols: Vec<(Piece, Option<usize>)> = Piece::chars(word)
            .into_iter()
            .map(|piece| {
                let position = self.vocab.position(&piece);
                (piece, position)
            })
            .collect();

        while let Some((pair, merged)) = self.lowest_rank_pair(&symbols) {
            let mut next = Vec::with_capacity(symbols.len());
            let mut i = 0;
            while i < symbols.len() {
                if i + 1 < symbols.len()
                    && symbols[i].1 == Some(pair.0)
                    && symbols[i + 1].1 == Some(pair.1)
                {
                    let merge = Merge::new(symbols[i].0.clone(), symbols[i + 1].0.clone());
                    next.push((merge.merged(), Some(merged)));
                    i += 2;
                } else {
                    next.push(symbols[i].clone());
                    i += 1;
                }
            }

            symbols = next;
        }

        symbols.into_iter().map(|(piece, _)| piece).collect()
    }

    fn lowest_rank_pair(
        &self,
        symbols: &[(Piece, Option<usize>)],
    ) -> Option<((usize, usize), usize)> {
        symbols
            .windows(2)
            .filter_map(|window| {
                let pair = (window[0].1?, window[1].1?);
                self.ranks.get(&pair).map(|&(rank, merged)| (rank, pair, merged))
            })
            .min_by_key(|(rank, _, _)| *rank)
            .map(|(_, pair, merged)| (pair, merged))
    }

    /// Encode a word into ids, mapping pieces outside the vocabulary to the unknown id
    pub fn encode_word(&self, word: &str) -> Vec<u32> {
        self.tokenize(word)
            .iter()
            .map(|piece| self.piece_to_id(piece))
            .collect()
    }

    /// The id of a piece, or the unknown id
    pub fn piece_to_id(&self, piece: &Piece) -> u32 {
        self.vocab
            .position(piece)
            .map(|position| (position + SPECIAL_TOKENS.len()) as u32)
            .unwrap_or(self.special_tokens.unknown)
    }

    /// Look up the id of a rendered token such as `##an` or `[CLS]`
    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        if let Some(index) = SPECIAL_TOKENS.iter().position(|special| *special == token) {
            return Some(index as u32);
        }

        self.vocab
            .position(&Piece::parse(token))
            .map(|position| (position + SPECIAL_TOKENS.len()) as u32)
    }

    /// The piece behind an id, if it is not a special token
    pub fn id_to_piece(&self, id: u32) -> Option<&Piece> {
        (id as usize)
            .checked_sub(SPECIAL_TOKENS.len())
            .and_then(|position| self.vocab.get(position))
    }

    /// Turn ids back into text, joining continuation pieces onto the preceding word
    ///
    /// Special tokens are skipped, except for the unknown marker.
    pub fn decode(&self, ids: &[u32]) -> String {
        let mut text = String::new();

        for &id in ids {
            if id == self.special_tokens.unknown {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(tokenization::UNK_TOKEN);
                continue;
            }

            let Some(piece) = self.id_to_piece(id) else {
                continue;
            };

            if !piece.continuation && !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&piece.text);
        }

        text
    }

    /// Save as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VocabError> {
        let file = TokenizerFile {
            special_tokens: SPECIAL_TOKENS.iter().map(|s| s.to_string()).collect(),
            vocab: self.vocab.clone(),
            merges: self.merges.clone(),
        };

        fs::write(path, serde_json::to_string_pretty(&file)?)?;

        Ok(())
    }

    /// Load from JSON written by [`BpeTokenizer::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VocabError> {
        let file: TokenizerFile = serde_json::from_str(&fs::read_to_string(path)?)?;

        if file.special_tokens != SPECIAL_TOKENS {
            return Err(VocabError::SpecialTokens(file.special_tokens));
        }

        Ok(Self::new(file.vocab, file.merges))
    }
}

impl From<Training> for BpeTokenizer {
    fn from(training: Training) -> Self {
        Self::new(training.vocab, training.merges)
    }
}

impl SubwordTokenizer for BpeTokenizer {
    fn tokenize_word(&self, word: &str) -> Result<Vec<u32>, TokenizerError> {
        Ok(self.encode_word(word))
    }

    fn id_to_token(&self, id: u32) -> Option<String> {
        SPECIAL_TOKENS
            .get(id as usize)
            .map(|special| special.to_string())
            .or_else(|| self.id_to_piece(id).map(|piece| piece.to_string()))
    }

    fn special_tokens(&self) -> &SpecialTokens {
        &self.special_tokens
    }
}
