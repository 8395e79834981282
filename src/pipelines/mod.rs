/// Token Classification
pub mod token_classification;

/// Masked language model inputs
pub mod fill_mask;
