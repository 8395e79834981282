/// Word-to-subword tag alignment
pub mod aligner;

/// Batcher
pub mod batcher;

/// Token Classification Items
pub mod item;

pub use aligner::{
    pad_batch, AlignError, AlignedBatch, AlignedSentence, Aligner, AlignerConfig,
    BatchAlignment, EmptyWordPolicy, TruncationPolicy,
};
pub use batcher::Batcher;
pub use item::Item;
