use std::collections::HashMap;

use derive_new::new;

use super::{Merge, Piece, Vocabulary};

/// Configuration for vocabulary training
#[derive(burn::config::Config, Debug)]
pub struct TrainerConfig {
    /// Target number of pieces in the vocabulary
    pub vocab_size: usize,

    /// Training stops once the most frequent pair occurs fewer times than this
    #[config(default = 2)]
    pub min_frequency: usize,
}

/// The outcome of training
#[derive(Debug, Clone, new)]
pub struct Training {
    /// The learned vocabulary
    pub vocab: Vocabulary,

    /// Merges in the order they were learned
    pub merges: Vec<Merge>,

    /// The training corpus as it stands after the last merge, one entry per input word
    pub corpus: Vec<Vec<Piece>>,
}

/// A distinct corpus word, held as vocabulary positions
#[derive(Debug)]
struct Word {
    ids: Vec<usize>,
    count: usize,
}

type Pair = (usize, usize);

/// Builds a subword vocabulary by repeatedly merging the most frequent adjacent pair
///
/// Pairs never span two words. When several pairs share the highest count, the one first
/// encountered in a left-to-right scan over the corpus in word order wins.
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    /// Creates a new trainer
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Train on a corpus of whole words
    pub fn train<I, S>(&self, corpus: I) -> Training
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocab = Vocabulary::new();
        let mut words: Vec<Word> = Vec::new();
        let mut word_index: HashMap<String, usize> = HashMap::new();
        let mut occurrences = Vec::new();

        for word in corpus {
            let word = word.as_ref();
            if word.is_empty() {
                continue;
            }

            let index = match word_index.get(word) {
                Some(&index) => index,
                None => {
                    let ids = Piece::chars(word)
                        .into_iter()
                        .map(|piece| {
                            vocab.insert(piece.clone());
                            vocab.position(&piece).unwrap_or_default()
                        })
                        .collect();

                    words.push(Word { ids, count: 0 });
                    word_index.insert(word.to_string(), words.len() - 1);
                    words.len() - 1
                }
            };

            words[index].count += 1;
            occurrences.push(index);
        }

        log::info!(
            "Training on {} words ({} distinct), {} initial pieces, target {}",
            occurrences.len(),
            words.len(),
            vocab.len(),
            self.config.vocab_size
        );

        let mut merges = Vec::new();

        while vocab.len() < self.config.vocab_size {
            let Some((pair, count)) = best_pair(&words, &vocab) else {
                break;
            };

            if count < self.config.min_frequency {
                log::debug!("Stopping, best pair occurs {} times", count);
                break;
            }

            let (Some(left), Some(right)) = (vocab.get(pair.0), vocab.get(pair.1)) else {
                break;
            };
            let merge = Merge::new(left.clone(), right.clone());
            let merged = merge.merged();

            vocab.insert(merged.clone());
            let new_id = vocab.len() - 1;

            for word in words.iter_mut() {
                replace_pair(&mut word.ids, pair, new_id);
            }

            log::debug!("Merge {}: ({}) -> {} x{}", merges.len(), merge, merged, count);
            merges.push(merge);
        }

        log::info!(
            "Learned {} merges, vocabulary has {} pieces",
            merges.len(),
            vocab.len()
        );

        let corpus = occurrences
            .into_iter()
            .map(|index| {
                words[index]
                    .ids
                    .iter()
                    .filter_map(|&id| vocab.get(id).cloned())
                    .collect()
            })
            .collect();

        Training::new(vocab, merges, corpus)
    }
}

/// Find the most frequent pair whose merge would add a new piece
fn best_pair(words: &[Word], vocab: &Vocabulary) -> Option<(Pair, usize)> {
    // pair -> (count, order of first appearance)
    let mut counts: HashMap<Pair, (usize, usize)> = HashMap::new();

    for word in words {
        for window in word.ids.windows(2) {
            let seen = counts.len();
            let entry = counts.entry((window[0], window[1])).or_insert((0, seen));
            entry.0 += word.count;
        }
    }

    counts
        .into_iter()
        .filter(|(pair, _)| !merge_exists(*pair, vocab))
        .min_by(|(_, (count_a, seen_a)), (_, (count_b, seen_b))| {
            count_b.cmp(count_a).then(seen_a.cmp(seen_b))
        })
        .map(|(pair, (count, _))| (pair, count))
}

/// True if merging the pair would not add a piece, keeping the vocabulary at one new piece per merge
fn merge_exists(pair: Pair, vocab: &Vocabulary) -> bool {
    match (vocab.get(pair.0), vocab.get(pair.1)) {
        (Some(left), Some(right)) => {
            vocab.contains(&Merge::new(left.clone(), right.clone()).merged())
        }
        _ => true,
    }
}

/// Replace every non-overlapping occurrence of a pair, scanning left to right
fn replace_pair(ids: &mut Vec<usize>, pair: Pair, new_id: usize) {
    if ids.len() < 2 {
        return;
    }

    let mut merged = Vec::with_capacity(ids.len());
    let mut i = 0;
    while i < ids.len() {
        if i + 1 < ids.len() && ids[i] == pair.0 && ids[i + 1] == pair.1 {
            merged.push(new_id);
            i += 2;
        } else {
            merged.push(ids[i]);
            i += 1;
        }
    }

    *ids = merged;
}
