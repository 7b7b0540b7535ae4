//! Root configuration for the embedding trainer.
//!
//! # Loading Configuration
//!
//! ```rust,ignore
//! use glove_embeddings::GloveConfig;
//!
//! // Load from file
//! let config = GloveConfig::from_file("glove.toml")?;
//!
//! // Or use defaults
//! let config = GloveConfig::default();
//!
//! // With environment overrides
//! let config = GloveConfig::default().with_env_overrides();
//! ```
//!
//! # TOML Structure
//!
//! ```toml
//! vector_size = 300
//! vocabulary_size = 6000
//! x_max = 100.0
//! alpha = 0.75
//! batch_size = 10000
//! epochs = 1
//!
//! [device]
//! kind = "cuda"
//! ordinal = 0
//!
//! [optimizer]
//! kind = "sgd"
//! learning_rate = 0.1
//! ```
//!
//! # Design Principles
//!
//! - **NO FALLBACKS**: Invalid config returns an error, never silently defaults
//! - **FAIL FAST**: File not found or parse error returns immediately
//! - **EXPLICIT DEVICE**: the device is a configuration value threaded into
//!   every tensor constructor, not a process-wide ambient default

use std::env;
use std::path::Path;

use candle_core::Device;
use serde::{Deserialize, Serialize};

use crate::error::{GloveError, GloveResult};
use crate::training::optimizer::OptimizerConfig;

/// Compute device for parameters and batch tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Host CPU.
    #[default]
    Cpu,
    /// CUDA device, selected by ordinal.
    Cuda,
}

/// Device placement configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device kind (default: cpu).
    #[serde(default)]
    pub kind: DeviceKind,
    /// CUDA device ordinal (ignored for cpu).
    #[serde(default)]
    pub ordinal: usize,
}

impl DeviceConfig {
    /// Construct the Candle device this configuration names.
    pub fn device(&self) -> GloveResult<Device> {
        match self.kind {
            DeviceKind::Cpu => Ok(Device::Cpu),
            DeviceKind::Cuda => {
                Device::new_cuda(self.ordinal).map_err(|e| GloveError::Backend {
                    message: format!("CUDA device {} unavailable: {}", self.ordinal, e),
                })
            }
        }
    }
}

/// Initialization strategy for the embedding and bias parameters.
///
/// The reference program zero-initializes everything, which leaves the
/// bilinear term with a zero gradient at the start (only the biases move
/// until one side becomes non-zero). Uniform initialization is the default;
/// zeros remain available to reproduce the reference arithmetic exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamInit {
    /// All parameters start at 0.0.
    Zeros,
    /// Uniform samples in `[-scale, scale]`.
    Uniform { scale: f32 },
}

impl Default for ParamInit {
    fn default() -> Self {
        ParamInit::Uniform { scale: 0.05 }
    }
}

/// Top-level configuration for model construction and training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GloveConfig {
    /// Embedding dimensionality `D` (default: 300).
    #[serde(default = "default_vector_size")]
    pub vector_size: usize,

    /// Vocabulary size `V`; row and column indices live in `[0, V)`
    /// (default: 6000).
    #[serde(default = "default_vocabulary_size")]
    pub vocabulary_size: usize,

    /// Saturation point of the weighting function (default: 100.0).
    /// Counts at or above `x_max` receive weight 1.0.
    #[serde(default = "default_x_max")]
    pub x_max: f32,

    /// Exponent of the weighting function, in `(0, 1]` (default: 0.75).
    #[serde(default = "default_alpha")]
    pub alpha: f32,

    /// Triples per chunk; one optimizer step is taken per chunk
    /// (default: 10000). The final chunk of a pass may be partial.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of full passes over the triple stream (default: 1).
    #[serde(default = "default_epochs")]
    pub epochs: u32,

    /// Emit a progress line every N optimizer steps (default: 100).
    #[serde(default = "default_log_every")]
    pub log_every: usize,

    /// Parameter initialization strategy.
    #[serde(default)]
    pub init: ParamInit,

    /// Device placement.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Optimizer selection and hyperparameters.
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

fn default_vector_size() -> usize {
    300
}

fn default_vocabulary_size() -> usize {
    6000
}

fn default_x_max() -> f32 {
    100.0
}

fn default_alpha() -> f32 {
    0.75
}

fn default_batch_size() -> usize {
    10000
}

fn default_epochs() -> u32 {
    1
}

fn default_log_every() -> usize {
    100
}

impl Default for GloveConfig {
    fn default() -> Self {
        Self {
            vector_size: default_vector_size(),
            vocabulary_size: default_vocabulary_size(),
            x_max: default_x_max(),
            alpha: default_alpha(),
            batch_size: default_batch_size(),
            epochs: default_epochs(),
            log_every: default_log_every(),
            init: ParamInit::default(),
            device: DeviceConfig::default(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl GloveConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> GloveResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: GloveConfig = toml::from_str(&content).map_err(|e| GloveError::Config {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GLOVE_*` environment variable overrides.
    ///
    /// Recognized: `GLOVE_VECTOR_SIZE`, `GLOVE_VOCABULARY_SIZE`,
    /// `GLOVE_BATCH_SIZE`, `GLOVE_EPOCHS`, `GLOVE_DEVICE` (`cpu`/`cuda`).
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = parse_env("GLOVE_VECTOR_SIZE") {
            self.vector_size = v;
        }
        if let Some(v) = parse_env("GLOVE_VOCABULARY_SIZE") {
            self.vocabulary_size = v;
        }
        if let Some(v) = parse_env("GLOVE_BATCH_SIZE") {
            self.batch_size = v;
        }
        if let Some(v) = parse_env("GLOVE_EPOCHS") {
            self.epochs = v;
        }
        if let Ok(v) = env::var("GLOVE_DEVICE") {
            match v.to_lowercase().as_str() {
                "cpu" => self.device.kind = DeviceKind::Cpu,
                "cuda" => self.device.kind = DeviceKind::Cuda,
                other => tracing::warn!("Ignoring unknown GLOVE_DEVICE value: {}", other),
            }
        }
        self
    }

    /// Validate all fields, failing fast on the first bad value.
    pub fn validate(&self) -> GloveResult<()> {
        if self.vector_size == 0 {
            return Err(config_error("vector_size must be > 0"));
        }
        if self.vocabulary_size == 0 {
            return Err(config_error("vocabulary_size must be > 0"));
        }
        if self.x_max <= 0.0 {
            return Err(config_error("x_max must be > 0"));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(config_error("alpha must be in (0, 1]"));
        }
        if self.batch_size == 0 {
            return Err(config_error("batch_size must be > 0"));
        }
        if self.log_every == 0 {
            return Err(config_error("log_every must be > 0"));
        }
        if let ParamInit::Uniform { scale } = self.init {
            if scale <= 0.0 {
                return Err(config_error("init scale must be > 0"));
            }
        }
        self.optimizer.validate()
    }

    /// Construct the configured Candle device.
    pub fn device(&self) -> GloveResult<Device> {
        self.device.device()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn config_error(message: &str) -> GloveError {
    GloveError::Config {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() {
        let config = GloveConfig::default();
        assert_eq!(config.vector_size, 300);
        assert_eq!(config.vocabulary_size, 6000);
        assert_eq!(config.x_max, 100.0);
        assert_eq!(config.alpha, 0.75);
        assert_eq!(config.batch_size, 10000);
        assert_eq!(config.epochs, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_vocabulary() {
        let config = GloveConfig {
            vocabulary_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GloveError::Config { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_alpha_out_of_range() {
        for alpha in [0.0, -0.5, 1.5] {
            let config = GloveConfig {
                alpha,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "alpha {} should fail", alpha);
        }
    }

    #[test]
    fn test_validate_rejects_non_positive_x_max() {
        let config = GloveConfig {
            x_max: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_with_partial_fields() {
        let toml_src = r#"
            vocabulary_size = 128
            vector_size = 16

            [optimizer]
            kind = "adam"
        "#;
        let config: GloveConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.vocabulary_size, 128);
        assert_eq!(config.vector_size, 16);
        // Unspecified fields fall back to defaults.
        assert_eq!(config.x_max, 100.0);
        assert_eq!(config.batch_size, 10000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cpu_device_constructs() {
        let config = GloveConfig::default();
        assert!(config.device().is_ok());
    }
}
