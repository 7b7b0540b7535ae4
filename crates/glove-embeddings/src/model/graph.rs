//! The weighted log-bilinear loss over the four trainable parameters.
//!
//! The model owns two embedding matrices and two bias vectors:
//!
//! | Parameter         | Shape    | Selected by |
//! |-------------------|----------|-------------|
//! | `main_vectors`    | `[D, V]` | `column`    |
//! | `context_vectors` | `[D, V]` | `row`       |
//! | `main_biases`     | `[1, V]` | `column`    |
//! | `context_biases`  | `[1, V]` | `row`       |
//!
//! The role-to-index binding (main selects by `column`, context by `row`) is
//! load-bearing: transposing it silently changes which embedding learns
//! which role. Lookups are therefore named, never positional.
//!
//! Per-sample loss for a triple `(row, column, count)`:
//!
//! ```text
//! weight(count) * (main . context + main_bias + context_bias - ln count)^2
//! ```
//!
//! The model is built exactly once and re-fed for every batch; only the
//! bound input tensors change per step.

use candle_core::{DType, Device, Tensor, Var};

use crate::config::{GloveConfig, ParamInit};
use crate::error::{GloveError, GloveResult};
use crate::model::onehot::one_hot;
use crate::model::weighting::weight_tensor;
use crate::training::data::TripleBatch;

/// Trainable GloVe model: parameters plus the loss composition.
pub struct GloveModel {
    main_vectors: Var,
    context_vectors: Var,
    main_biases: Var,
    context_biases: Var,
    vocabulary_size: usize,
    vector_size: usize,
    x_max: f32,
    alpha: f32,
    device: Device,
}

impl GloveModel {
    /// Build the model's parameters on the given device.
    pub fn new(config: &GloveConfig, device: &Device) -> GloveResult<Self> {
        let v = config.vocabulary_size;
        let d = config.vector_size;

        let main_vectors = init_param(config.init, (d, v), device)?;
        let context_vectors = init_param(config.init, (d, v), device)?;
        let main_biases = init_param(config.init, (1, v), device)?;
        let context_biases = init_param(config.init, (1, v), device)?;

        for (name, param) in [
            ("main_vectors", &main_vectors),
            ("context_vectors", &context_vectors),
            ("main_biases", &main_biases),
            ("context_biases", &context_biases),
        ] {
            tracing::debug!(param = name, shape = ?param.as_tensor().dims(), "created parameter");
        }

        Ok(Self {
            main_vectors,
            context_vectors,
            main_biases,
            context_biases,
            vocabulary_size: v,
            vector_size: d,
            x_max: config.x_max,
            alpha: config.alpha,
            device: device.clone(),
        })
    }

    /// Per-sample loss `[B]` for one batch, in the batch's own order.
    pub fn forward(&self, batch: &TripleBatch) -> GloveResult<Tensor> {
        let b = batch.len();
        if b == 0 {
            return Err(GloveError::ShapeMismatch {
                context: "batch",
                expected: 1,
                actual: 0,
            });
        }
        batch.check_aligned()?;

        let counts = Tensor::from_slice(&batch.counts, b, &self.device).map_err(map_candle)?;
        let column_selectors = one_hot(&batch.columns, self.vocabulary_size, &self.device)?;
        let row_selectors = one_hot(&batch.rows, self.vocabulary_size, &self.device)?;

        // Column selections against the [D, V] matrices yield [B, D].
        let main = self.lookup_matrix(&self.main_vectors, &column_selectors)?;
        let context = self.lookup_matrix(&self.context_vectors, &row_selectors)?;
        let main_bias = self.lookup_bias(&self.main_biases, &column_selectors)?;
        let context_bias = self.lookup_bias(&self.context_biases, &row_selectors)?;

        // Inner product over the embedding axis, one scalar per sample.
        let dot = (main * context)
            .map_err(map_candle)?
            .sum(1)
            .map_err(map_candle)?;

        let predicted = dot
            .add(&main_bias)
            .map_err(map_candle)?
            .add(&context_bias)
            .map_err(map_candle)?;
        let residual = predicted
            .sub(&counts.log().map_err(map_candle)?)
            .map_err(map_candle)?;

        let weight = weight_tensor(&counts, self.x_max, self.alpha)?;
        residual
            .sqr()
            .map_err(map_candle)?
            .mul(&weight)
            .map_err(map_candle)
    }

    /// Scalar batch loss: the per-sample losses reduced by sum, the root of
    /// the backward pass.
    pub fn batch_loss(&self, batch: &TripleBatch) -> GloveResult<Tensor> {
        self.forward(batch)?.sum_all().map_err(map_candle)
    }

    /// The ordered parameter set handed to the optimizer.
    pub fn parameters(&self) -> [&Var; 4] {
        [
            &self.main_vectors,
            &self.context_vectors,
            &self.main_biases,
            &self.context_biases,
        ]
    }

    /// Main embedding for vocabulary index `i` (column `i` of `[D, V]`).
    pub fn main_vector(&self, index: usize) -> GloveResult<Vec<f32>> {
        self.column_of(&self.main_vectors, index)
    }

    /// Context embedding for vocabulary index `i`.
    pub fn context_vector(&self, index: usize) -> GloveResult<Vec<f32>> {
        self.column_of(&self.context_vectors, index)
    }

    /// Main bias for vocabulary index `i`.
    pub fn main_bias(&self, index: usize) -> GloveResult<f32> {
        Ok(self.column_of(&self.main_biases, index)?[0])
    }

    /// Context bias for vocabulary index `i`.
    pub fn context_bias(&self, index: usize) -> GloveResult<f32> {
        Ok(self.column_of(&self.context_biases, index)?[0])
    }

    /// Vocabulary size `V`.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    /// Embedding dimensionality `D`.
    pub fn vector_size(&self) -> usize {
        self.vector_size
    }

    /// The device the parameters live on.
    pub fn device(&self) -> &Device {
        &self.device
    }

    fn lookup_matrix(&self, param: &Var, selectors: &Tensor) -> GloveResult<Tensor> {
        // [B, V] x [V, D] -> [B, D]; gradients flow back into the selected
        // columns of the parameter only.
        selectors
            .matmul(&param.as_tensor().t().map_err(map_candle)?)
            .map_err(map_candle)
    }

    fn lookup_bias(&self, param: &Var, selectors: &Tensor) -> GloveResult<Tensor> {
        // [B, V] x [V, 1] -> [B, 1] -> [B]
        selectors
            .matmul(&param.as_tensor().t().map_err(map_candle)?)
            .map_err(map_candle)?
            .squeeze(1)
            .map_err(map_candle)
    }

    fn column_of(&self, param: &Var, index: usize) -> GloveResult<Vec<f32>> {
        if index >= self.vocabulary_size {
            return Err(GloveError::IndexOutOfRange {
                index: index as u32,
                vocabulary_size: self.vocabulary_size,
            });
        }
        param
            .as_tensor()
            .narrow(1, index, 1)
            .map_err(map_candle)?
            .flatten_all()
            .map_err(map_candle)?
            .to_vec1::<f32>()
            .map_err(map_candle)
    }
}

fn init_param(init: ParamInit, shape: (usize, usize), device: &Device) -> GloveResult<Var> {
    match init {
        ParamInit::Zeros => Var::zeros(shape, DType::F32, device).map_err(map_candle),
        ParamInit::Uniform { scale } => {
            Var::rand(-scale, scale, shape, device).map_err(map_candle)
        }
    }
}

fn map_candle(e: candle_core::Error) -> GloveError {
    GloveError::Backend {
        message: format!("Model error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::weighting::weight_scalar;
    use crate::training::data::CooccurrenceTriple;

    fn zero_init_config(v: usize, d: usize) -> GloveConfig {
        GloveConfig {
            vocabulary_size: v,
            vector_size: d,
            init: ParamInit::Zeros,
            ..Default::default()
        }
    }

    fn batch_of(triples: &[(u32, u32, f32)], v: usize) -> TripleBatch {
        let triples: Vec<CooccurrenceTriple> = triples
            .iter()
            .map(|&(row, column, count)| CooccurrenceTriple { row, column, count })
            .collect();
        TripleBatch::from_triples(&triples, v, 0).unwrap()
    }

    #[test]
    fn test_zero_init_unit_count_gives_zero_loss() {
        // dot = 0, biases = 0, residual = -ln(1) = 0, loss = weight * 0 = 0.
        let model = GloveModel::new(&zero_init_config(4, 2), &Device::Cpu).unwrap();
        let batch = batch_of(&[(0, 1, 1.0)], 4);

        let loss: Vec<f32> = model.forward(&batch).unwrap().to_vec1().unwrap();
        assert_eq!(loss, vec![0.0]);
    }

    #[test]
    fn test_zero_init_euler_count_gives_weighted_unit_loss() {
        // residual = 0 - ln(e) = -1, loss = weight * 1.
        let model = GloveModel::new(&zero_init_config(4, 2), &Device::Cpu).unwrap();
        let e = std::f32::consts::E;
        let batch = batch_of(&[(0, 1, e)], 4);

        let loss: Vec<f32> = model.forward(&batch).unwrap().to_vec1().unwrap();
        let expected = weight_scalar(e, 100.0, 0.75);
        assert!(
            (loss[0] - expected).abs() < 1e-5,
            "expected {}, got {}",
            expected,
            loss[0]
        );
    }

    #[test]
    fn test_identical_builds_give_identical_loss() {
        let config = zero_init_config(6, 3);
        let first = GloveModel::new(&config, &Device::Cpu).unwrap();
        let second = GloveModel::new(&config, &Device::Cpu).unwrap();
        let batch = batch_of(&[(0, 1, 2.0), (3, 2, 7.5), (5, 5, 150.0)], 6);

        let a: Vec<f32> = first.forward(&batch).unwrap().to_vec1().unwrap();
        let b: Vec<f32> = second.forward(&batch).unwrap().to_vec1().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_forward_preserves_batch_order() {
        let config = GloveConfig {
            vocabulary_size: 8,
            vector_size: 4,
            ..Default::default()
        };
        let model = GloveModel::new(&config, &Device::Cpu).unwrap();

        let forward_batch = batch_of(&[(0, 1, 2.0), (2, 3, 30.0)], 8);
        let reversed_batch = batch_of(&[(2, 3, 30.0), (0, 1, 2.0)], 8);

        let forward: Vec<f32> = model.forward(&forward_batch).unwrap().to_vec1().unwrap();
        let reversed: Vec<f32> = model.forward(&reversed_batch).unwrap().to_vec1().unwrap();
        assert_eq!(forward[0], reversed[1]);
        assert_eq!(forward[1], reversed[0]);
    }

    #[test]
    fn test_forward_rejects_out_of_range_row() {
        let model = GloveModel::new(&zero_init_config(4, 2), &Device::Cpu).unwrap();
        let batch = TripleBatch {
            counts: vec![1.0],
            columns: vec![0],
            rows: vec![4],
        };
        assert!(matches!(
            model.forward(&batch),
            Err(GloveError::IndexOutOfRange { index: 4, .. })
        ));
    }

    #[test]
    fn test_forward_rejects_misaligned_batch() {
        let model = GloveModel::new(&zero_init_config(4, 2), &Device::Cpu).unwrap();
        let batch = TripleBatch {
            counts: vec![1.0, 2.0],
            columns: vec![0],
            rows: vec![1, 2],
        };
        assert!(matches!(
            model.forward(&batch),
            Err(GloveError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_forward_rejects_empty_batch() {
        let model = GloveModel::new(&zero_init_config(4, 2), &Device::Cpu).unwrap();
        let batch = TripleBatch::default();
        assert!(matches!(
            model.forward(&batch),
            Err(GloveError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_column_accessors_shape_and_bounds() {
        let model = GloveModel::new(&zero_init_config(5, 3), &Device::Cpu).unwrap();
        assert_eq!(model.main_vector(4).unwrap().len(), 3);
        assert_eq!(model.context_vector(0).unwrap().len(), 3);
        assert_eq!(model.main_bias(2).unwrap(), 0.0);
        assert!(model.main_vector(5).is_err());
    }

    #[test]
    fn test_batch_loss_sums_per_sample_losses() {
        let model = GloveModel::new(&zero_init_config(4, 2), &Device::Cpu).unwrap();
        let batch = batch_of(&[(0, 1, 2.0), (1, 2, 5.0), (2, 3, 9.0)], 4);

        let per_sample: Vec<f32> = model.forward(&batch).unwrap().to_vec1().unwrap();
        let total: f32 = model.batch_loss(&batch).unwrap().to_scalar().unwrap();
        let expected: f32 = per_sample.iter().sum();
        assert!((total - expected).abs() < 1e-6);
    }
}
