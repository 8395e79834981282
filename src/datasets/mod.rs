/// Tagged sentence datasets stored as CSV
pub mod tagged;

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// The dataset file could not be read
    #[error("unable to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// An item has a different number of words and tags
    #[error("item {index} has {words} words but {tags} tags")]
    LengthMismatch {
        /// Position of the item in the dataset
        index: usize,
        /// Number of words
        words: usize,
        /// Number of tags
        tags: usize,
    },
}
