//! Error type for the embedding trainer.
//!
//! # Design Principles
//!
//! - **NO FALLBACKS**: Errors must propagate, not be silently handled
//! - **FAIL FAST**: A bad triple aborts the run before it enters a batch
//! - **CONTEXTUAL**: Every variant carries the values that triggered it
//!
//! All errors are fatal to the current training run. Callers may retry at
//! the run level, never at the triple level.

use thiserror::Error;

/// Error type for the embedding trainer.
#[derive(Debug, Error)]
pub enum GloveError {
    // === Input Errors ===
    /// A co-occurrence triple failed validation (non-positive count or an
    /// index outside the vocabulary). Raised before the triple enters a batch.
    #[error(
        "Invalid triple at position {position}: (row {row}, column {column}, count {count}): {reason}"
    )]
    InvalidTriple {
        position: usize,
        row: u32,
        column: u32,
        count: f32,
        reason: String,
    },

    /// An index handed to the one-hot encoder falls outside `[0, V)`.
    /// The encoder never clamps or wraps.
    #[error("Index {index} out of range for vocabulary of size {vocabulary_size}")]
    IndexOutOfRange {
        index: u32,
        vocabulary_size: usize,
    },

    /// A batch's tensor shapes disagree with the graph's declared inputs.
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    // === Infrastructure Errors ===
    /// The Candle runtime reported a failure (device allocation, kernel
    /// launch, shape propagation). Surfaced, not recovered.
    #[error("Backend error: {message}")]
    Backend { message: String },

    // === Configuration Errors ===
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Filesystem failure while reading configuration.
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Result type alias used throughout the crate.
pub type GloveResult<T> = Result<T, GloveError>;
