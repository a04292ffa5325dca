//! Per-pixel criteria applied to a single prediction head.
//!
//! | criterion | unreduced loss              |
//! |-----------|-----------------------------|
//! | `L1`      | `abs(x - y)`                |
//! | `Mse`     | `(x - y)^2`                 |
//! | `Bce`     | `-(y log x + (1 - y) log(1 - x))` |
//!
//! `Bce` expects probabilities (the model heads end in a sigmoid), not logits.

use burn::{
    config::Config,
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

/// Probabilities are clamped into `[EPSILON, 1 - EPSILON]` before taking the log.
const EPSILON: f64 = 1e-7;

/// Pixel-wise criterion comparing a prediction head with its target.
#[derive(Config, Debug, Copy, PartialEq, Eq)]
pub enum PixelCriterion {
    /// Mean absolute error.
    L1,
    /// Mean squared error.
    Mse,
    /// Binary cross-entropy on probabilities.
    Bce,
}

impl PixelCriterion {
    /// Compute the criterion with reduction.
    ///
    /// # Shapes
    ///
    /// - predictions: `[...dims]`
    /// - targets: `[...dims]` (same shape as predictions)
    /// - output: `[1]`
    pub fn forward<const D: usize, B: Backend>(
        &self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
        reduction: Reduction,
    ) -> Tensor<B, 1> {
        let loss = self.forward_no_reduction(predictions, targets);
        match reduction {
            Reduction::Mean | Reduction::Auto => loss.mean(),
            Reduction::Sum => loss.sum(),
        }
    }

    /// Compute the element-wise criterion.
    ///
    /// # Shapes
    ///
    /// - predictions: `[...dims]`
    /// - targets: `[...dims]` (same shape as predictions)
    /// - output: `[...dims]`
    pub fn forward_no_reduction<const D: usize, B: Backend>(
        &self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> Tensor<B, D> {
        let pred_dims = predictions.dims();
        let target_dims = targets.dims();
        assert_eq!(
            pred_dims, target_dims,
            "Shape of predictions ({pred_dims:?}) must match targets ({target_dims:?})"
        );

        match self {
            Self::L1 => (predictions - targets).abs(),
            Self::Mse => (predictions - targets).powi_scalar(2),
            Self::Bce => {
                let probs = predictions.clamp(EPSILON, 1.0 - EPSILON);
                let positive = targets.clone() * probs.clone().log();
                let negative = targets.neg().add_scalar(1.0) * probs.neg().add_scalar(1.0).log();
                (positive + negative).neg()
            }
        }
    }
}
