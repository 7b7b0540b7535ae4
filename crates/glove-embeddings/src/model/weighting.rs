//! Saturating co-occurrence weighting: `min(1, (count / x_max)^alpha)`.

use candle_core::Tensor;

use crate::error::{GloveError, GloveResult};

/// Elementwise training weight for a batch of co-occurrence counts.
///
/// Broadcasts over an arbitrary batch dimension. Counts at or above `x_max`
/// saturate at exactly 1.0; a zero count yields weight 0.0.
pub fn weight_tensor(counts: &Tensor, x_max: f32, alpha: f32) -> GloveResult<Tensor> {
    let scaled = counts
        .affine(1.0 / x_max as f64, 0.0)
        .map_err(map_candle)?;
    let powered = scaled.powf(alpha as f64).map_err(map_candle)?;
    let ones = Tensor::ones_like(&powered).map_err(map_candle)?;
    powered.minimum(&ones).map_err(map_candle)
}

/// Scalar form of [`weight_tensor`], for inspection and tests.
pub fn weight_scalar(count: f32, x_max: f32, alpha: f32) -> f32 {
    (count / x_max).powf(alpha).min(1.0)
}

fn map_candle(e: candle_core::Error) -> GloveError {
    GloveError::Backend {
        message: format!("Weighting error: {}", e),
    }
}
