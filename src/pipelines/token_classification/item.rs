use std::fmt::Debug;

/// A trait for items that can be used for token classification
pub trait Item: Send + Sync + Clone + Debug {
    /// Returns the words of the sentence
    fn words(&self) -> Vec<&str>;

    /// Returns one tag per word
    fn tags(&self) -> Vec<&str>;
}
