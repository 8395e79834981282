use std::collections::HashMap;

use burn_subword::{
    pipelines::token_classification::{Aligner, AlignerConfig},
    tokenization::{SpecialTokens, SubwordTokenizer, TokenizerError},
    vocab::{BpeTokenizer, Piece, Trainer, TrainerConfig},
};
use pretty_assertions::assert_eq;

/// Splits "don't" into three pieces and every other known word into one
struct Contractions {
    ids: HashMap<&'static str, Vec<u32>>,
    special_tokens: SpecialTokens,
}

impl Contractions {
    fn new() -> Self {
        let ids = [
            ("I", vec![100]),
            ("don't", vec![101, 102, 103]),
            ("like", vec![104]),
            ("it", vec![105]),
            (".", vec![106]),
            ("you", vec![107]),
            ("do", vec![108]),
        ]
        .into_iter()
        .collect();

        Self {
            ids,
            special_tokens: SpecialTokens::new(1, 2, 0, 3, 4),
        }
    }
}

impl SubwordTokenizer for Contractions {
    fn tokenize_word(&self, word: &str) -> Result<Vec<u32>, TokenizerError> {
        Ok(self.ids.get(word).cloned().unwrap_or_default())
    }

    fn id_to_token(&self, id: u32) -> Option<String> {
        self.ids
            .iter()
            .find(|(_, ids)| ids.contains(&id))
            .map(|(word, _)| word.to_string())
    }

    fn special_tokens(&self) -> &SpecialTokens {
        &self.special_tokens
    }
}

#[test]
fn banana_learns_an() {
    let training = Trainer::new(TrainerConfig::new(4)).train(["banana"]);

    let vocab: Vec<String> = training.vocab.iter().map(|p| p.to_string()).collect();
    assert_eq!(vocab, vec!["b", "##a", "##n", "##an"]);

    let corpus: Vec<String> = training.corpus[0].iter().map(|p| p.to_string()).collect();
    assert_eq!(corpus, vec!["b", "##an", "##an", "##a"]);
}

#[test]
fn vocabulary_grows_by_one_per_merge() {
    let corpus = "the quick brown fox jumps over the lazy dog and the quicker fox \
                  jumps over the lazier dogs";
    let words: Vec<&str> = corpus.split_whitespace().collect();

    let base = Trainer::new(TrainerConfig::new(0)).train(&words).vocab.len();
    let mut previous = base;

    for vocab_size in base + 1..base + 12 {
        let training = Trainer::new(TrainerConfig::new(vocab_size)).train(&words);

        assert_eq!(training.vocab.len(), base + training.merges.len());
        assert!(training.vocab.len() >= previous);
        previous = training.vocab.len();
    }
}

#[test]
fn tokenization_round_trips_words() {
    let corpus = "low lower lowest newer wider new low widest";
    let tokenizer: BpeTokenizer = Trainer::new(TrainerConfig::new(24))
        .train(corpus.split_whitespace())
        .into();

    for word in corpus.split_whitespace().chain(["slowly", "renewal"]) {
        let pieces = tokenizer.tokenize(word);
        let spelled: String = pieces.iter().map(|p| p.text.as_str()).collect();

        assert_eq!(spelled, word);
        assert!(!pieces[0].continuation);
        assert!(pieces[1..].iter().all(|p| p.continuation));
    }

    assert_eq!(
        tokenizer.tokenize("low"),
        vec![Piece::initial("low")],
        "a frequent word becomes a single piece"
    );
}

#[test]
fn contraction_carries_one_tag() {
    let aligner = Aligner::new(Contractions::new(), AlignerConfig::new());
    let pairs = [
        ("I", "PRON"),
        ("don't", "VERB"),
        ("like", "PROP"),
        ("it", "PROP"),
        (".", "."),
    ];

    let aligned = aligner.align_pairs(&pairs, "NO_TAG").unwrap();

    assert_eq!(aligned.tag_mask.iter().filter(|m| **m).count(), 5);
    assert_eq!(
        aligned.tags,
        vec!["NO_TAG", "PRON", "VERB", "NO_TAG", "NO_TAG", "PROP", "PROP", ".", "NO_TAG"]
    );
    for span in &aligned.word_spans {
        assert!(aligned.tag_mask[span.start]);
        assert!(aligned.tag_mask[span.start + 1..span.end].iter().all(|m| !m));
    }
}

#[test]
fn batch_pads_to_nine() {
    let aligner = Aligner::new(Contractions::new(), AlignerConfig::new());
    let sentences = vec![
        (vec!["I", "don't", "like", "it", "."], vec![1, 2, 3, 3, 4]),
        (vec!["you", "do", "like", "it", "."], vec![1, 2, 3, 3, 4]),
    ];

    let batch = aligner.align_batch(&sentences, 0).into_result().unwrap();

    assert_eq!(batch.lengths, vec![9, 7]);
    for row in 0..batch.len() {
        assert_eq!(batch.token_ids[row].len(), 9);
        assert_eq!(batch.attention_mask[row].len(), 9);
        assert_eq!(batch.tags[row].len(), 9);
        assert_eq!(batch.tag_mask[row].len(), 9);

        // carriers only where tokens are present
        for (carrier, present) in batch.tag_mask[row].iter().zip(&batch.attention_mask[row]) {
            assert!(!carrier || *present);
        }
        assert_eq!(batch.tag_mask[row].iter().filter(|m| **m).count(), 5);
    }

    let pad = aligner.tokenizer().special_tokens().pad;
    assert_eq!(batch.token_ids[1][7..].to_vec(), vec![pad, pad]);
    assert_eq!(
        batch.attention_mask[1],
        [vec![true; 7], vec![false; 2]].concat()
    );
    assert_eq!(batch.tag_mask[1][7..].to_vec(), vec![false, false]);
    assert_eq!(batch.tags[1][7..].to_vec(), vec![0, 0]);
}

#[test]
fn trained_vocabulary_feeds_the_aligner() {
    let corpus = "play some music play the song book a table for two";
    let tokenizer: BpeTokenizer = Trainer::new(TrainerConfig::new(30))
        .train(corpus.split_whitespace())
        .into();
    let specials = *tokenizer.special_tokens();
    let aligner = Aligner::new(tokenizer, AlignerConfig::new());

    let aligned = aligner
        .align_sentence(&["play", "music"], &["O", "B-music_item"], "O")
        .unwrap();

    assert_eq!(aligned.token_ids[0], specials.start);
    assert_eq!(*aligned.token_ids.last().unwrap(), specials.end);
    assert_eq!(aligned.word_values(&aligned.tags), vec!["O", "B-music_item"]);

    let decoded = aligner.tokenizer().decode(&aligned.token_ids);
    assert_eq!(decoded, "play music");
}
