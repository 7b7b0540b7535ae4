//! One-hot encoding of vocabulary indices.

use candle_core::{Device, Tensor};

use crate::error::{GloveError, GloveResult};

/// Encode a batch of vocabulary indices as a `[B, V]` selection matrix.
///
/// Each row carries a single 1.0 at the given index, oriented so that
/// `one_hot(indices) . P.t()` selects columns of a `[D, V]` parameter.
/// An out-of-range index is an error; the encoder never clamps or wraps.
pub fn one_hot(indices: &[u32], vocabulary_size: usize, device: &Device) -> GloveResult<Tensor> {
    let mut data = vec![0.0f32; indices.len() * vocabulary_size];
    for (position, &index) in indices.iter().enumerate() {
        if index as usize >= vocabulary_size {
            return Err(GloveError::IndexOutOfRange {
                index,
                vocabulary_size,
            });
        }
        data[position * vocabulary_size + index as usize] = 1.0;
    }
    Tensor::from_vec(data, (indices.len(), vocabulary_size), device).map_err(map_candle)
}

fn map_candle(e: candle_core::Error) -> GloveError {
    GloveError::Backend {
        message: format!("One-hot encoding error: {}", e),
    }
}
