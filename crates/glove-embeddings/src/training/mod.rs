//! Training: triple streaming and batching, the optimizer, and the
//! sequential minibatch loop.

pub mod data;
pub mod optimizer;
pub mod trainer;

pub use data::{CooccurrenceTriple, RandomTripleSource, TripleBatch, TripleLoader, TripleSource};
pub use optimizer::{GloveOptimizer, OptimizerConfig, OptimizerKind};
pub use trainer::{EpochResult, GloveTrainer, TrainingHistory};
