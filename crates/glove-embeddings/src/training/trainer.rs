//! The sequential minibatch training loop.
//!
//! One pass: pull a fixed-size chunk from the triple source, convert it to
//! the graph's input tensors, take exactly one optimizer step, repeat until
//! the stream is exhausted. An outer epoch counter restarts the source.
//! Batch conversion and stepping are strictly sequential; the four
//! parameters are mutated only inside the optimizer step.

use std::time::Instant;

use candle_core::Device;

use crate::config::GloveConfig;
use crate::error::{GloveError, GloveResult};
use crate::model::graph::GloveModel;
use crate::training::data::{TripleBatch, TripleLoader, TripleSource};
use crate::training::optimizer::GloveOptimizer;

/// Result of a single training epoch (one full pass over the stream).
#[derive(Debug, Clone)]
pub struct EpochResult {
    /// Epoch number (1-indexed).
    pub epoch: u32,
    /// Number of optimizer steps taken (one per chunk).
    pub num_batches: usize,
    /// Triples consumed in this epoch.
    pub triples_seen: usize,
    /// Batch loss averaged over the epoch's steps.
    pub avg_batch_loss: f32,
}

/// Metrics accumulated across the whole run.
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    /// Per-epoch results.
    pub epochs: Vec<EpochResult>,
    /// Total optimizer steps across all epochs.
    pub total_steps: usize,
    /// Total triples consumed across all epochs.
    pub triples_seen: usize,
    /// Loss of the most recent batch.
    pub last_batch_loss: f32,
}

/// Drives the model and optimizer over a chunked triple stream.
pub struct GloveTrainer {
    model: GloveModel,
    optimizer: GloveOptimizer,
    config: GloveConfig,
    history: TrainingHistory,
    device: Device,
}

impl GloveTrainer {
    /// Validate the configuration, build the model on the configured device,
    /// and bind the optimizer to the full parameter set.
    pub fn new(config: GloveConfig) -> GloveResult<Self> {
        config.validate()?;
        let device = config.device()?;
        let model = GloveModel::new(&config, &device)?;

        let mut optimizer = GloveOptimizer::new(config.optimizer.clone());
        for var in model.parameters() {
            optimizer.add_param(var.clone())?;
        }

        tracing::info!(
            vocabulary_size = config.vocabulary_size,
            vector_size = config.vector_size,
            batch_size = config.batch_size,
            optimizer = ?config.optimizer.kind,
            "trainer ready"
        );

        Ok(Self {
            model,
            optimizer,
            config,
            history: TrainingHistory::default(),
            device,
        })
    }

    /// One optimizer step against an already-validated batch.
    pub fn train_step(&mut self, batch: &TripleBatch) -> GloveResult<f32> {
        let loss = self.model.batch_loss(batch)?;
        let loss_value: f32 = loss.to_scalar().map_err(|e| GloveError::Backend {
            message: format!("Trainer error: {}", e),
        })?;
        self.optimizer.step(&loss)?;

        self.history.total_steps += 1;
        self.history.triples_seen += batch.len();
        self.history.last_batch_loss = loss_value;
        Ok(loss_value)
    }

    /// Run the configured number of epochs over the source.
    ///
    /// The first invalid triple aborts the run; nothing from its chunk
    /// reaches the optimizer.
    pub fn train<S: TripleSource>(&mut self, source: &S) -> GloveResult<&TrainingHistory> {
        let started = Instant::now();

        for epoch in 1..=self.config.epochs {
            let mut loader = TripleLoader::new(
                source.triples(),
                self.config.batch_size,
                self.config.vocabulary_size,
            );

            let mut num_batches = 0usize;
            let mut loss_sum = 0.0f32;

            while let Some(batch) = loader.next_chunk()? {
                let batch_loss = self.train_step(&batch)?;
                num_batches += 1;
                loss_sum += batch_loss;

                if self.history.total_steps % self.config.log_every == 0 {
                    tracing::info!(
                        epoch,
                        step = self.history.total_steps,
                        batch_loss,
                        elapsed = ?started.elapsed(),
                        "training progress"
                    );
                }
            }

            let avg_batch_loss = if num_batches > 0 {
                loss_sum / num_batches as f32
            } else {
                0.0
            };
            tracing::info!(
                epoch,
                num_batches,
                avg_batch_loss,
                elapsed = ?started.elapsed(),
                "epoch complete"
            );
            self.history.epochs.push(EpochResult {
                epoch,
                num_batches,
                triples_seen: loader.consumed(),
                avg_batch_loss,
            });
        }

        Ok(&self.history)
    }

    /// The trained model.
    pub fn model(&self) -> &GloveModel {
        &self.model
    }

    /// The run's accumulated metrics.
    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    /// The active configuration.
    pub fn config(&self) -> &GloveConfig {
        &self.config
    }

    /// The device parameters and batches live on.
    pub fn device(&self) -> &Device {
        &self.device
    }
}
