use std::path::Path;

use burn::data::dataset::{self, Dataset as _, InMemDataset};
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::{pipelines::token_classification, utils::classes::distinct_labels};

use super::DatasetError;

/// A sentence with one tag per word, both whitespace separated
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Item {
    /// The words of the sentence
    pub words: String,

    /// The tag of each word
    pub tags: String,
}

impl token_classification::Item for Item {
    fn words(&self) -> Vec<&str> {
        self.words.split_whitespace().collect()
    }

    fn tags(&self) -> Vec<&str> {
        self.tags.split_whitespace().collect()
    }
}

/// Struct for a tagged sentence dataset
pub struct Dataset {
    /// Underlying In-Memory dataset
    dataset: InMemDataset<Item>,
}

/// Implement the Dataset trait for the tagged sentence dataset
impl dataset::Dataset<Item> for Dataset {
    /// Returns a specific item from the dataset
    fn get(&self, index: usize) -> Option<Item> {
        self.dataset.get(index)
    }

    /// Returns the length of the dataset
    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl Dataset {
    /// Wrap items that are already in memory
    pub fn from_items(items: Vec<Item>) -> Self {
        Self {
            dataset: InMemDataset::new(items),
        }
    }

    /// Load a CSV file with `words` and `tags` columns
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let reader = csv::ReaderBuilder::new();

        let dataset: InMemDataset<Item> = InMemDataset::from_csv(path, &reader)?;

        log::info!("Loaded {} tagged sentences", dataset.len());

        Ok(Self { dataset })
    }

    /// The distinct tags used in the dataset, sorted
    pub fn labels(&self) -> Vec<String> {
        let items: Vec<Item> = self.iter().collect();

        distinct_labels(items.iter().flat_map(|item| item.tags.split_whitespace()))
    }

    /// Check that every item has as many tags as words
    pub fn validate(&self) -> Result<(), DatasetError> {
        for (index, item) in self.iter().enumerate() {
            let words = item.words.split_whitespace().count();
            let tags = item.tags.split_whitespace().count();

            if words != tags {
                return Err(DatasetError::LengthMismatch { index, words, tags });
            }
        }

        Ok(())
    }
}
