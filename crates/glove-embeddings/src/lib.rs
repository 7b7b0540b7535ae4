//! GloVe-style co-occurrence embedding trainer.
//!
//! This crate trains weighted word-co-occurrence embeddings (a log-bilinear
//! factorization with learned per-row and per-column biases) from a stream of
//! `(row, column, count)` triples over a fixed vocabulary, using the Candle
//! backend for tensors and autograd.
//!
//! # Architecture
//!
//! - **GloveModel**: the four trainable parameters (two `[D, V]` embedding
//!   matrices, two `[1, V]` bias vectors) and the loss composition, built
//!   once and re-fed per batch
//! - **TripleSource / TripleLoader**: restartable lazy triple producers and
//!   fixed-size chunked batching with fail-fast validation
//! - **GloveOptimizer**: SGD or Adam over the registered parameters
//! - **GloveTrainer**: the sequential minibatch loop, one optimizer step per
//!   chunk
//!
//! # Example
//!
//! ```rust
//! use glove_embeddings::{GloveConfig, GloveTrainer, RandomTripleSource};
//!
//! let mut config = GloveConfig::default();
//! config.vocabulary_size = 32;
//! config.vector_size = 8;
//! config.batch_size = 16;
//!
//! let source = RandomTripleSource::new(config.vocabulary_size, 64, 42);
//! let mut trainer = GloveTrainer::new(config).unwrap();
//! let history = trainer.train(&source).unwrap();
//! assert_eq!(history.total_steps, 4);
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod training;

pub use config::{DeviceConfig, DeviceKind, GloveConfig, ParamInit};
pub use error::{GloveError, GloveResult};
pub use model::graph::GloveModel;
pub use model::onehot::one_hot;
pub use model::weighting::{weight_scalar, weight_tensor};
pub use training::data::{
    CooccurrenceTriple, RandomTripleSource, TripleBatch, TripleLoader, TripleSource,
};
pub use training::optimizer::{GloveOptimizer, OptimizerConfig, OptimizerKind};
pub use training::trainer::{EpochResult, GloveTrainer, TrainingHistory};
