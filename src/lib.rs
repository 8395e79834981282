//! # Burn Subword
//!
//! Subword vocabularies built with byte-pair encoding, and alignment of word-level tags onto
//! subword sequences for token classification.
#![forbid(unsafe_code)]

/// Vocabulary training and tokenization
pub mod vocab;

/// The tokenizer interface shared by the pipelines
pub mod tokenization;

/// Pipelines
pub mod pipelines;

/// Datasets
pub mod datasets;

/// Utilities
pub mod utils;
