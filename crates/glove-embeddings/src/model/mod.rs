//! Model construction: weighting function, one-hot encoding, and the
//! weighted least-squares loss over the four trainable parameters.

pub mod graph;
pub mod onehot;
pub mod weighting;

pub use graph::GloveModel;
pub use onehot::one_hot;
pub use weighting::{weight_scalar, weight_tensor};
