use std::ops::Range;

use derive_new::new;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::tokenization::{SubwordTokenizer, TokenizerError};

/// What to do with a word that tokenizes to nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmptyWordPolicy {
    /// Reject the sentence
    Reject,

    /// Stand in the unknown id for the word, so it still carries its tag
    Unknown,
}

/// What to do with a sentence longer than the maximum sequence length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TruncationPolicy {
    /// Reject the sentence
    Reject,

    /// Drop whole words from the end until the sentence fits, keeping both markers
    DropTrailingWords,
}

/// Aligner Configuration
#[derive(burn::config::Config, Debug)]
pub struct AlignerConfig {
    /// Maximum aligned length including the start and end markers
    pub max_seq_length: Option<usize>,

    /// Handling of words without subwords
    #[config(default = "EmptyWordPolicy::Reject")]
    pub empty_word: EmptyWordPolicy,

    /// Handling of over-long sentences
    #[config(default = "TruncationPolicy::Reject")]
    pub truncation: TruncationPolicy,
}

/// One sentence at subword level
#[derive(Debug, Clone, PartialEq, new)]
pub struct AlignedSentence<T> {
    /// Subword ids, framed by the start and end markers
    pub token_ids: Vec<u32>,

    /// The word's tag at each carrier position, the no-tag value elsewhere
    pub tags: Vec<T>,

    /// True at the first subword of each word
    pub tag_mask: Vec<bool>,

    /// The subword positions of each word that was kept
    pub word_spans: Vec<Range<usize>>,

    /// Number of words dropped from the end to fit the maximum length
    pub truncated_words: usize,
}

impl<T> AlignedSentence<T> {
    /// Aligned length
    pub fn len(&self) -> usize {
        self.token_ids.len()
    }

    /// True if there are no positions at all
    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }

    /// Read one value per word from a per-subword sequence, taken at each word's first subword
    pub fn word_values<V: Clone>(&self, per_token: &[V]) -> Vec<V> {
        word_values(&self.word_spans, per_token)
    }
}

/// A batch of aligned sentences, right-padded to a common length
///
/// Every row of the four matrices has `seq_length` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedBatch<T> {
    /// Subword ids, padded with the pad id
    pub token_ids: Vec<Vec<u32>>,

    /// True for real positions, false for padding
    pub attention_mask: Vec<Vec<bool>>,

    /// Aligned tags, padded with the no-tag value
    pub tags: Vec<Vec<T>>,

    /// True at tag carriers, false for padding
    pub tag_mask: Vec<Vec<bool>>,

    /// Unpadded length of each row
    pub lengths: Vec<usize>,

    /// Subword positions of each word, per row
    pub word_spans: Vec<Vec<Range<usize>>>,

    /// The input position of the sentence behind each row
    pub indices: Vec<usize>,

    /// The padded length
    pub seq_length: usize,
}

impl<T> AlignedBatch<T> {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.token_ids.len()
    }

    /// True if no sentence made it into the batch
    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }

    /// Read one value per word of a row from a per-subword sequence
    pub fn word_values<V: Clone>(&self, row: usize, per_token: &[V]) -> Vec<V> {
        self.word_spans
            .get(row)
            .map(|spans| word_values(spans, per_token))
            .unwrap_or_default()
    }
}

fn word_values<V: Clone>(spans: &[Range<usize>], per_token: &[V]) -> Vec<V> {
    spans
        .iter()
        .filter_map(|span| per_token.get(span.start).cloned())
        .collect()
}

/// The outcome of aligning a batch where each sentence succeeds or fails on its own
#[derive(Debug)]
pub struct BatchAlignment<T> {
    /// The padded batch of accepted sentences
    pub batch: AlignedBatch<T>,

    /// Rejected sentences by input position
    pub rejected: Vec<(usize, AlignError)>,
}

impl<T> BatchAlignment<T> {
    /// Fail on the first rejected sentence
    pub fn into_result(self) -> Result<AlignedBatch<T>, AlignError> {
        match self.rejected.into_iter().next() {
            Some((index, error)) => Err(AlignError::Rejected {
                index,
                source: Box::new(error),
            }),
            None => Ok(self.batch),
        }
    }
}

/// Right-pad aligned sentences to the longest one
pub fn pad_batch<T: Clone>(
    sentences: Vec<AlignedSentence<T>>,
    pad_id: u32,
    no_tag: T,
) -> AlignedBatch<T> {
    let batch_size = sentences.len();
    let seq_length = sentences.iter().map(|s| s.len()).max().unwrap_or(0);

    let mut batch = AlignedBatch {
        token_ids: Vec::with_capacity(batch_size),
        attention_mask: Vec::with_capacity(batch_size),
        tags: Vec::with_capacity(batch_size),
        tag_mask: Vec::with_capacity(batch_size),
        lengths: Vec::with_capacity(batch_size),
        word_spans: Vec::with_capacity(batch_size),
        indices: (0..batch_size).collect(),
        seq_length,
    };

    for sentence in sentences {
        let length = sentence.len();
        let padding = seq_length - length;

        let mut token_ids = sentence.token_ids;
        token_ids.resize(seq_length, pad_id);

        let mut attention_mask = vec![true; length];
        attention_mask.resize(seq_length, false);

        let mut tags = sentence.tags;
        tags.resize(seq_length, no_tag.clone());

        let mut tag_mask = sentence.tag_mask;
        tag_mask.resize(seq_length, false);

        if padding > 0 {
            log::trace!("Padding sentence of length {} by {}", length, padding);
        }

        batch.token_ids.push(token_ids);
        batch.attention_mask.push(attention_mask);
        batch.tags.push(tags);
        batch.tag_mask.push(tag_mask);
        batch.lengths.push(length);
        batch.word_spans.push(sentence.word_spans);
    }

    batch
}

/// Expands word-level tags onto the subwords produced by a tokenizer
///
/// Each sentence is framed by the start and end markers. The first subword of every word carries
/// the word's tag; the markers, the remaining subwords and padding get the no-tag value.
pub struct Aligner<Tok: SubwordTokenizer> {
    tokenizer: Tok,
    config: AlignerConfig,
}

impl<Tok: SubwordTokenizer> Aligner<Tok> {
    /// Creates a new aligner
    pub fn new(tokenizer: Tok, config: AlignerConfig) -> Self {
        Self { tokenizer, config }
    }

    /// The tokenizer
    pub fn tokenizer(&self) -> &Tok {
        &self.tokenizer
    }

    /// The configuration
    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Align one sentence given as parallel word and tag sequences
    pub fn align_sentence<S, T>(
        &self,
        words: &[S],
        tags: &[T],
        no_tag: T,
    ) -> Result<AlignedSentence<T>, AlignError>
    where
        S: AsRef<str>,
        T: Clone,
    {
        if words.len() != tags.len() {
            return Err(AlignError::LengthMismatch {
                words: words.len(),
                tags: tags.len(),
            });
        }

        let pieces = self.tokenize_words(words)?;
        let (pieces, truncated_words) = self.fit(pieces)?;

        let specials = self.tokenizer.special_tokens();
        let length = 2 + pieces.iter().map(Vec::len).sum::<usize>();

        let mut sentence = AlignedSentence::new(
            Vec::with_capacity(length),
            Vec::with_capacity(length),
            Vec::with_capacity(length),
            Vec::with_capacity(pieces.len()),
            truncated_words,
        );

        sentence.token_ids.push(specials.start);
        sentence.tags.push(no_tag.clone());
        sentence.tag_mask.push(false);

        for (ids, tag) in pieces.into_iter().zip(tags) {
            let start = sentence.token_ids.len();

            for (i, id) in ids.into_iter().enumerate() {
                sentence.token_ids.push(id);
                if i == 0 {
                    sentence.tags.push(tag.clone());
                    sentence.tag_mask.push(true);
                } else {
                    sentence.tags.push(no_tag.clone());
                    sentence.tag_mask.push(false);
                }
            }

            sentence.word_spans.push(start..sentence.token_ids.len());
        }

        sentence.token_ids.push(specials.end);
        sentence.tags.push(no_tag);
        sentence.tag_mask.push(false);

        Ok(sentence)
    }

    /// Align one sentence given as (word, tag) pairs
    pub fn align_pairs<S, T>(
        &self,
        pairs: &[(S, T)],
        no_tag: T,
    ) -> Result<AlignedSentence<T>, AlignError>
    where
        S: AsRef<str>,
        T: Clone,
    {
        let (words, tags): (Vec<&str>, Vec<T>) = pairs
            .iter()
            .map(|(word, tag)| (word.as_ref(), tag.clone()))
            .unzip();

        self.align_sentence(&words, &tags, no_tag)
    }

    /// Align untagged words, marking only where each word starts
    pub fn align_words<S: AsRef<str>>(&self, words: &[S]) -> Result<AlignedSentence<()>, AlignError> {
        self.align_sentence(words, &vec![(); words.len()], ())
    }

    /// Align and pad a batch, rejecting malformed sentences without affecting the others
    ///
    /// Sentences are aligned in parallel; rows keep the input order.
    pub fn align_batch<S, T>(&self, sentences: &[(Vec<S>, Vec<T>)], no_tag: T) -> BatchAlignment<T>
    where
        S: AsRef<str> + Sync,
        T: Clone + Send + Sync,
    {
        let results: Vec<_> = sentences
            .par_iter()
            .map(|(words, tags)| self.align_sentence(words, tags, no_tag.clone()))
            .collect();

        let mut accepted = Vec::with_capacity(results.len());
        let mut indices = Vec::with_capacity(results.len());
        let mut rejected = Vec::new();

        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(sentence) => {
                    if sentence.truncated_words > 0 {
                        log::warn!(
                            "Sentence {} truncated, dropped its last {} words",
                            index,
                            sentence.truncated_words
                        );
                    }

                    accepted.push(sentence);
                    indices.push(index);
                }
                Err(error) => {
                    log::warn!("Sentence {} rejected: {}", index, error);
                    rejected.push((index, error));
                }
            }
        }

        let mut batch = pad_batch(accepted, self.tokenizer.special_tokens().pad, no_tag);
        batch.indices = indices;

        BatchAlignment { batch, rejected }
    }

    fn tokenize_words<S: AsRef<str>>(&self, words: &[S]) -> Result<Vec<Vec<u32>>, AlignError> {
        words
            .iter()
            .enumerate()
            .map(|(position, word)| {
                let word = word.as_ref();
                let ids = self.tokenizer.tokenize_word(word)?;

                if !ids.is_empty() {
                    return Ok(ids);
                }

                match self.config.empty_word {
                    EmptyWordPolicy::Reject => Err(AlignError::EmptyTokenization {
                        word: word.to_string(),
                        position,
                    }),
                    EmptyWordPolicy::Unknown => {
                        log::debug!("Substituting the unknown id for {:?}", word);
                        Ok(vec![self.tokenizer.special_tokens().unknown])
                    }
                }
            })
            .collect()
    }

    /// Apply the maximum length, returning the kept words and the number dropped
    fn fit(&self, mut pieces: Vec<Vec<u32>>) -> Result<(Vec<Vec<u32>>, usize), AlignError> {
        let Some(max) = self.config.max_seq_length else {
            return Ok((pieces, 0));
        };

        let length = 2 + pieces.iter().map(Vec::len).sum::<usize>();
        if length <= max {
            return Ok((pieces, 0));
        }

        let too_long = AlignError::SequenceTooLong { length, max };
        if self.config.truncation == TruncationPolicy::Reject {
            return Err(too_long);
        }

        let words = pieces.len();
        let mut kept = length;
        while kept > max {
            match pieces.pop() {
                Some(ids) => kept -= ids.len(),
                None => break,
            }
        }

        if pieces.is_empty() {
            return Err(too_long);
        }

        let dropped = words - pieces.len();

        Ok((pieces, dropped))
    }
}

/// Alignment Error
#[derive(thiserror::Error, Debug)]
pub enum AlignError {
    /// The word and tag sequences of a sentence differ in length
    #[error("sentence has {words} words but {tags} tags")]
    LengthMismatch {
        /// Number of words
        words: usize,
        /// Number of tags
        tags: usize,
    },

    /// A word produced no subwords
    #[error("word {position} ({word:?}) has no subwords")]
    EmptyTokenization {
        /// The word
        word: String,
        /// Its position in the sentence
        position: usize,
    },

    /// A sentence does not fit the maximum sequence length
    #[error("aligned length {length} exceeds the maximum of {max}")]
    SequenceTooLong {
        /// Aligned length including the markers
        length: usize,
        /// The configured maximum
        max: usize,
    },

    /// The tokenizer failed
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    /// A sentence in a batch was rejected
    #[error("sentence {index} rejected: {source}")]
    Rejected {
        /// Input position of the sentence
        index: usize,
        /// Why it was rejected
        source: Box<AlignError>,
    },
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use crate::tokenization::SpecialTokens;

    use super::*;

    /// Looks words up in a fixed table; unknown words get no subwords
    struct TableTokenizer {
        words: HashMap<&'static str, Vec<u32>>,
        special_tokens: SpecialTokens,
    }

    impl TableTokenizer {
        fn new() -> Self {
            let words = [
                ("I", vec![10]),
                ("don't", vec![11, 12, 13]),
                ("like", vec![14]),
                ("it", vec![15]),
                (".", vec![16]),
                ("you", vec![17]),
                ("do", vec![18]),
            ]
            .into_iter()
            .collect();

            Self {
                words,
                special_tokens: SpecialTokens::new(2, 3, 0, 4, 1),
            }
        }
    }

    impl SubwordTokenizer for TableTokenizer {
        fn tokenize_word(&self, word: &str) -> Result<Vec<u32>, TokenizerError> {
            Ok(self.words.get(word).cloned().unwrap_or_default())
        }

        fn id_to_token(&self, id: u32) -> Option<String> {
            Some(format!("<{}>", id))
        }

        fn special_tokens(&self) -> &SpecialTokens {
            &self.special_tokens
        }
    }

    fn aligner(config: AlignerConfig) -> Aligner<TableTokenizer> {
        Aligner::new(TableTokenizer::new(), config)
    }

    fn sentence() -> Vec<(&'static str, &'static str)> {
        vec![
            ("I", "PRON"),
            ("don't", "VERB"),
            ("like", "PROP"),
            ("it", "PROP"),
            (".", "."),
        ]
    }

    #[test]
    fn test_first_subword_carries_the_tag() {
        let aligned = aligner(AlignerConfig::new())
            .align_pairs(&sentence(), "-")
            .unwrap();

        assert_eq!(aligned.token_ids, vec![2, 10, 11, 12, 13, 14, 15, 16, 3]);
        assert_eq!(
            aligned.tags,
            vec!["-", "PRON", "VERB", "-", "-", "PROP", "PROP", ".", "-"]
        );
        assert_eq!(
            aligned.tag_mask,
            vec![false, true, true, false, false, true, true, true, false]
        );
        assert_eq!(aligned.tag_mask.iter().filter(|m| **m).count(), 5);
        assert_eq!(aligned.word_spans, vec![1..2, 2..5, 5..6, 6..7, 7..8]);
        assert_eq!(aligned.truncated_words, 0);
    }

    #[test]
    fn test_word_values_reads_carriers() {
        let aligned = aligner(AlignerConfig::new())
            .align_pairs(&sentence(), "-")
            .unwrap();

        let predicted = aligned.tags.clone();
        assert_eq!(
            aligned.word_values(&predicted),
            vec!["PRON", "VERB", "PROP", "PROP", "."]
        );
    }

    #[test]
    fn test_length_mismatch() {
        let result = aligner(AlignerConfig::new()).align_sentence(&["I", "like"], &["PRON"], "-");

        assert!(matches!(
            result,
            Err(AlignError::LengthMismatch { words: 2, tags: 1 })
        ));
    }

    #[test]
    fn test_empty_tokenization_policies() {
        let words = ["I", "zzz", "it"];
        let tags = [1, 2, 3];

        let rejected = aligner(AlignerConfig::new()).align_sentence(&words, &tags, 0);
        assert!(matches!(
            rejected,
            Err(AlignError::EmptyTokenization { ref word, position: 1 }) if word == "zzz"
        ));

        let substituted = aligner(AlignerConfig::new().with_empty_word(EmptyWordPolicy::Unknown))
            .align_sentence(&words, &tags, 0)
            .unwrap();
        assert_eq!(substituted.token_ids, vec![2, 10, 1, 15, 3]);
        assert_eq!(substituted.tags, vec![0, 1, 2, 3, 0]);
        assert_eq!(substituted.tag_mask.iter().filter(|m| **m).count(), 3);
    }

    #[test]
    fn test_over_long_sentences() {
        let config = AlignerConfig::new().with_max_seq_length(Some(6));

        let rejected = aligner(config.clone()).align_pairs(&sentence(), "-");
        assert!(matches!(
            rejected,
            Err(AlignError::SequenceTooLong { length: 9, max: 6 })
        ));

        let truncated = aligner(config.with_truncation(TruncationPolicy::DropTrailingWords))
            .align_pairs(&sentence(), "-")
            .unwrap();
        // "I don't" fills 4 positions; adding "like" would make 7 with the markers
        assert_eq!(truncated.token_ids, vec![2, 10, 11, 12, 13, 3]);
        assert_eq!(truncated.tags, vec!["-", "PRON", "VERB", "-", "-", "-"]);
        assert_eq!(truncated.truncated_words, 3);
    }

    #[test]
    fn test_maximum_too_small_for_any_word() {
        let config = AlignerConfig::new()
            .with_max_seq_length(Some(2))
            .with_truncation(TruncationPolicy::DropTrailingWords);

        let result = aligner(config).align_pairs(&sentence(), "-");

        assert!(matches!(result, Err(AlignError::SequenceTooLong { .. })));
    }

    #[test]
    fn test_pads_to_the_longest_sentence() {
        let sentences = vec![
            (
                vec!["I", "don't", "like", "it", "."],
                vec!["PRON", "VERB", "PROP", "PROP", "."],
            ),
            (
                vec!["you", "do", "like", "it", "."],
                vec!["PRON", "VERB", "PROP", "PROP", "."],
            ),
        ];

        let batch = aligner(AlignerConfig::new())
            .align_batch(&sentences, "-")
            .into_result()
            .unwrap();

        assert_eq!(batch.seq_length, 9);
        assert_eq!(batch.lengths, vec![9, 7]);
        assert!(batch.token_ids.iter().all(|row| row.len() == 9));
        assert_eq!(batch.token_ids[1], vec![2, 17, 18, 14, 15, 16, 3, 0, 0]);
        assert_eq!(
            batch.attention_mask[1],
            [vec![true; 7], vec![false; 2]].concat()
        );
        assert_eq!(
            batch.tag_mask[1],
            vec![false, true, true, true, true, true, false, false, false]
        );
        assert_eq!(batch.tags[1][7..].to_vec(), vec!["-", "-"]);
        assert_eq!(batch.indices, vec![0, 1]);
    }

    #[test]
    fn test_batch_isolates_rejected_sentences() {
        let sentences = vec![
            (vec!["I", "like", "it"], vec![1, 2, 2]),
            (vec!["I", "like"], vec![1]),
            (vec!["you", "do"], vec![1, 2]),
        ];

        let alignment = aligner(AlignerConfig::new()).align_batch(&sentences, 0);

        assert_eq!(alignment.batch.len(), 2);
        assert_eq!(alignment.batch.indices, vec![0, 2]);
        assert_eq!(alignment.batch.seq_length, 5);
        assert_eq!(alignment.batch.token_ids[1], vec![2, 17, 18, 3, 0]);
        assert_eq!(alignment.rejected.len(), 1);
        assert_eq!(alignment.rejected[0].0, 1);

        assert!(matches!(
            alignment.into_result(),
            Err(AlignError::Rejected { index: 1, .. })
        ));
    }

    #[test]
    fn test_empty_batch() {
        let sentences: Vec<(Vec<&str>, Vec<u32>)> = Vec::new();
        let batch = aligner(AlignerConfig::new())
            .align_batch(&sentences, 0)
            .into_result()
            .unwrap();

        assert!(batch.is_empty());
        assert_eq!(batch.seq_length, 0);
    }

    #[test]
    fn test_align_words() {
        let aligned = aligner(AlignerConfig::new())
            .align_words(&["don't", "do"])
            .unwrap();

        assert_eq!(aligned.token_ids, vec![2, 11, 12, 13, 18, 3]);
        assert_eq!(
            aligned.tag_mask,
            vec![false, true, false, false, true, false]
        );
    }
}
