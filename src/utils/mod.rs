/// Tensor Utilities
pub mod tensors;

/// Utilities for classification tasks
pub mod classes;

/// Evaluation metrics
pub mod metrics;
