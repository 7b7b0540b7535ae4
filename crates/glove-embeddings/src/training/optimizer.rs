//! Gradient-based learner over Candle `Var` parameters.
//!
//! One optimizer instance owns the full ordered parameter set of the loss
//! graph. Each step runs:
//! - one backward pass over the batch loss
//! - global-norm gradient clipping (`max_grad_norm`)
//! - the selected update rule: plain SGD, or Adam with per-parameter moment
//!   estimates and bias correction
//!
//! Updated values and moment estimates are detached so computation graphs
//! never chain across steps.

use candle_core::{DType, Tensor, Var};
use serde::{Deserialize, Serialize};

use crate::error::{GloveError, GloveResult};

/// Selectable update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Plain gradient descent.
    Sgd,
    /// Adam with bias-corrected moment estimates.
    Adam,
}

/// Optimizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Update rule (default: sgd, matching the reference program).
    #[serde(default = "default_kind")]
    pub kind: OptimizerKind,
    /// Constant learning rate (default: 0.1).
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// First moment exponential decay rate (Adam only).
    #[serde(default = "default_beta1")]
    pub beta1: f64,
    /// Second moment exponential decay rate (Adam only).
    #[serde(default = "default_beta2")]
    pub beta2: f64,
    /// Numerical stability constant.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Maximum global gradient norm before clipping.
    #[serde(default = "default_max_grad_norm")]
    pub max_grad_norm: f64,
}

fn default_kind() -> OptimizerKind {
    OptimizerKind::Sgd
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_beta1() -> f64 {
    0.9
}

fn default_beta2() -> f64 {
    0.999
}

fn default_epsilon() -> f64 {
    1e-8
}

fn default_max_grad_norm() -> f64 {
    1.0
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            learning_rate: default_learning_rate(),
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
            max_grad_norm: default_max_grad_norm(),
        }
    }
}

impl OptimizerConfig {
    /// Reject hyperparameters the update rules cannot work with.
    pub fn validate(&self) -> GloveResult<()> {
        if self.learning_rate <= 0.0 {
            return Err(GloveError::Config {
                message: "learning_rate must be > 0".to_string(),
            });
        }
        if !(self.beta1 >= 0.0 && self.beta1 < 1.0) || !(self.beta2 >= 0.0 && self.beta2 < 1.0) {
            return Err(GloveError::Config {
                message: "beta1 and beta2 must be in [0, 1)".to_string(),
            });
        }
        if self.max_grad_norm <= 0.0 {
            return Err(GloveError::Config {
                message: "max_grad_norm must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// A tracked parameter with its moment estimates.
struct TrackedParam {
    /// The trainable variable.
    var: Var,
    /// First moment estimate (unused by SGD).
    m: Tensor,
    /// Second moment estimate (unused by SGD).
    v: Tensor,
}

/// SGD/Adam learner bound to the loss graph's parameter set.
pub struct GloveOptimizer {
    config: OptimizerConfig,
    params: Vec<TrackedParam>,
    step: usize,
}

impl GloveOptimizer {
    /// Create an optimizer with no registered parameters.
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            params: Vec::new(),
            step: 0,
        }
    }

    /// Register a trainable parameter. Registration order is the parameter
    /// order for the lifetime of the optimizer.
    pub fn add_param(&mut self, var: Var) -> GloveResult<()> {
        let shape = var.as_tensor().shape().clone();
        let device = var.as_tensor().device().clone();

        let m = Tensor::zeros(&shape, DType::F32, &device).map_err(map_candle)?;
        let v = Tensor::zeros(&shape, DType::F32, &device).map_err(map_candle)?;

        self.params.push(TrackedParam { var, m, v });
        Ok(())
    }

    /// Perform one optimization step against the scalar batch loss.
    pub fn step(&mut self, loss: &Tensor) -> GloveResult<()> {
        self.step += 1;
        let t = self.step as f64;

        let grads = loss.backward().map_err(map_candle)?;

        // Global gradient norm, computed before any parameter is touched.
        let mut total_sq = 0.0f64;
        for param in &self.params {
            if let Some(grad) = grads.get(param.var.as_tensor()) {
                let sq_sum: f32 = grad
                    .sqr()
                    .map_err(map_candle)?
                    .sum_all()
                    .map_err(map_candle)?
                    .to_scalar()
                    .map_err(map_candle)?;
                total_sq += sq_sum as f64;
            }
        }
        let total_norm = total_sq.sqrt();

        let clip_scale = if total_norm > self.config.max_grad_norm {
            self.config.max_grad_norm / (total_norm + self.config.epsilon)
        } else {
            1.0
        };

        let kind = self.config.kind;
        let lr = self.config.learning_rate;
        let beta1 = self.config.beta1;
        let beta2 = self.config.beta2;
        let epsilon = self.config.epsilon;

        for param in &mut self.params {
            let grad = match grads.get(param.var.as_tensor()) {
                Some(g) => g,
                None => continue, // No gradient for this parameter
            };

            let clipped_grad = if (clip_scale - 1.0).abs() > 1e-9 {
                grad.affine(clip_scale, 0.0).map_err(map_candle)?
            } else {
                grad.clone()
            };

            let new_val = match kind {
                OptimizerKind::Sgd => {
                    // θ = θ - lr * grad
                    param
                        .var
                        .as_tensor()
                        .sub(&clipped_grad.affine(lr, 0.0).map_err(map_candle)?)
                        .map_err(map_candle)?
                }
                OptimizerKind::Adam => {
                    let bc1 = 1.0 - beta1.powi(t as i32);
                    let bc2 = 1.0 - beta2.powi(t as i32);

                    // m = β1 * m + (1 - β1) * grad
                    // Detached: moments are optimizer state, not model params.
                    param.m = param
                        .m
                        .affine(beta1, 0.0)
                        .map_err(map_candle)?
                        .add(&clipped_grad.affine(1.0 - beta1, 0.0).map_err(map_candle)?)
                        .map_err(map_candle)?
                        .detach();

                    // v = β2 * v + (1 - β2) * grad^2
                    let grad_sq = clipped_grad.sqr().map_err(map_candle)?;
                    param.v = param
                        .v
                        .affine(beta2, 0.0)
                        .map_err(map_candle)?
                        .add(&grad_sq.affine(1.0 - beta2, 0.0).map_err(map_candle)?)
                        .map_err(map_candle)?
                        .detach();

                    let m_hat = param.m.affine(1.0 / bc1, 0.0).map_err(map_candle)?;
                    let v_hat = param.v.affine(1.0 / bc2, 0.0).map_err(map_candle)?;

                    // θ = θ - lr * m_hat / (sqrt(v_hat) + eps)
                    let v_sqrt = v_hat.sqrt().map_err(map_candle)?;
                    let eps_tensor = Tensor::ones_like(&v_sqrt)
                        .map_err(map_candle)?
                        .affine(epsilon, 0.0)
                        .map_err(map_candle)?;
                    let denom = v_sqrt.add(&eps_tensor).map_err(map_candle)?;
                    let step_update = m_hat
                        .div(&denom)
                        .map_err(map_candle)?
                        .affine(-lr, 0.0)
                        .map_err(map_candle)?;

                    param
                        .var
                        .as_tensor()
                        .add(&step_update)
                        .map_err(map_candle)?
                }
            }
            .detach();

            param.var.set(&new_val).map_err(map_candle)?;
        }

        Ok(())
    }

    /// Steps taken so far.
    pub fn global_step(&self) -> usize {
        self.step
    }

    /// Number of registered parameters.
    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    /// The optimizer configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

fn map_candle(e: candle_core::Error) -> GloveError {
    GloveError::Backend {
        message: format!("Optimizer error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn sgd_config(lr: f64) -> OptimizerConfig {
        OptimizerConfig {
            kind: OptimizerKind::Sgd,
            learning_rate: lr,
            max_grad_norm: 1e9, // effectively no clipping
            ..Default::default()
        }
    }

    /// loss = sum(θ * c); d loss / d θ = c.
    fn linear_loss(var: &Var, coefficients: &[f32]) -> Tensor {
        let c = Tensor::from_slice(coefficients, coefficients.len(), &Device::Cpu).unwrap();
        var.as_tensor().mul(&c).unwrap().sum_all().unwrap()
    }

    #[test]
    fn test_sgd_step_moves_against_gradient() {
        let var = Var::from_tensor(
            &Tensor::from_slice(&[1.0f32, 2.0, 3.0], 3, &Device::Cpu).unwrap(),
        )
        .unwrap();
        let mut opt = GloveOptimizer::new(sgd_config(0.5));
        opt.add_param(var.clone()).unwrap();

        let loss = linear_loss(&var, &[1.0, -2.0, 0.0]);
        opt.step(&loss).unwrap();

        let updated: Vec<f32> = var.as_tensor().to_vec1().unwrap();
        // θ - 0.5 * grad with grad = [1, -2, 0].
        assert_eq!(updated, vec![0.5, 3.0, 3.0]);
        assert_eq!(opt.global_step(), 1);
    }

    #[test]
    fn test_clipping_caps_update_magnitude() {
        let var = Var::from_tensor(&Tensor::zeros(4, DType::F32, &Device::Cpu).unwrap()).unwrap();
        let config = OptimizerConfig {
            kind: OptimizerKind::Sgd,
            learning_rate: 1.0,
            max_grad_norm: 1.0,
            ..Default::default()
        };
        let mut opt = GloveOptimizer::new(config);
        opt.add_param(var.clone()).unwrap();

        // Gradient norm is 200, far above the cap of 1.
        let loss = linear_loss(&var, &[100.0, 100.0, 100.0, 100.0]);
        opt.step(&loss).unwrap();

        let updated: Vec<f32> = var.as_tensor().to_vec1().unwrap();
        let update_norm: f32 = updated.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!(
            (update_norm - 1.0).abs() < 1e-3,
            "clipped update norm should be lr * max_grad_norm = 1, got {}",
            update_norm
        );
    }

    #[test]
    fn test_adam_first_step_size_is_learning_rate() {
        // With bias correction, Adam's first step is lr * g / (|g| + eps),
        // i.e. lr in magnitude regardless of the gradient scale.
        let var = Var::from_tensor(
            &Tensor::from_slice(&[1.0f32, 1.0], 2, &Device::Cpu).unwrap(),
        )
        .unwrap();
        let config = OptimizerConfig {
            kind: OptimizerKind::Adam,
            learning_rate: 0.1,
            max_grad_norm: 1e9,
            ..Default::default()
        };
        let mut opt = GloveOptimizer::new(config);
        opt.add_param(var.clone()).unwrap();

        let loss = linear_loss(&var, &[7.0, -3.0]);
        opt.step(&loss).unwrap();

        let updated: Vec<f32> = var.as_tensor().to_vec1().unwrap();
        assert!((updated[0] - 0.9).abs() < 1e-4, "got {}", updated[0]);
        assert!((updated[1] - 1.1).abs() < 1e-4, "got {}", updated[1]);
    }

    #[test]
    fn test_param_without_gradient_is_untouched() {
        let trained = Var::from_tensor(
            &Tensor::from_slice(&[1.0f32, 1.0], 2, &Device::Cpu).unwrap(),
        )
        .unwrap();
        let idle = Var::from_tensor(
            &Tensor::from_slice(&[5.0f32, 5.0], 2, &Device::Cpu).unwrap(),
        )
        .unwrap();
        let mut opt = GloveOptimizer::new(sgd_config(0.1));
        opt.add_param(trained.clone()).unwrap();
        opt.add_param(idle.clone()).unwrap();
        assert_eq!(opt.num_params(), 2);

        let loss = linear_loss(&trained, &[1.0, 1.0]);
        opt.step(&loss).unwrap();

        let untouched: Vec<f32> = idle.as_tensor().to_vec1().unwrap();
        assert_eq!(untouched, vec![5.0, 5.0]);
    }

    #[test]
    fn test_config_validation() {
        assert!(OptimizerConfig::default().validate().is_ok());
        assert!(OptimizerConfig {
            learning_rate: 0.0,
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(OptimizerConfig {
            beta1: 1.0,
            ..Default::default()
        }
        .validate()
        .is_err());
    }
}
