use std::fmt;

use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

use crate::accumulator::ErrorAccumulator;

/// Lower bound applied to ground truth and prediction before computing ratios
/// and logarithms, so maps containing zeros yield finite statistics.
pub const DEFAULT_MIN_VALUE: f64 = 1e-3;

/// Error statistics of a set of predicted maps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthErrors {
    /// Fraction of pixels with ratio below 1.25.
    pub a1: f64,
    /// Fraction of pixels with ratio below 1.25².
    pub a2: f64,
    /// Fraction of pixels with ratio below 1.25³.
    pub a3: f64,
    /// Mean absolute relative error.
    pub abs_rel: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean absolute log10 error.
    pub log_10: f64,
}

impl fmt::Display for DepthErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "a1={:.4} a2={:.4} a3={:.4} abs_rel={:.4} rmse={:.4} log_10={:.4}",
            self.a1, self.a2, self.a3, self.abs_rel, self.rmse, self.log_10
        )
    }
}

/// Compute the error statistics of `prediction` against `ground_truth`.
///
/// Both tensors are clamped below at [`DEFAULT_MIN_VALUE`]. Returns `None`
/// when the tensors hold no element.
///
/// # Panics
///
/// When the shapes differ.
pub fn compute_errors<B: Backend, const D: usize>(
    ground_truth: Tensor<B, D>,
    prediction: Tensor<B, D>,
) -> Option<DepthErrors> {
    let mut accumulator = ErrorAccumulator::new();
    accumulator.update(ground_truth, prediction);
    accumulator.finish()
}

#[cfg(test)]
mod tests {
    use burn::tensor::TensorData;

    use super::*;
    use crate::tests::TestBackend;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn compute_errors_matches_hand_computed_values() {
        let device = Default::default();
        let gt = Tensor::<TestBackend, 1>::from_data(TensorData::from([1.0, 2.0, 4.0, 8.0]), &device);
        let pred =
            Tensor::<TestBackend, 1>::from_data(TensorData::from([1.0, 2.0, 2.0, 16.0]), &device);

        let errors = compute_errors(gt, pred).unwrap();

        // ratios: 1, 1, 2, 2
        assert_close(errors.a1, 0.5);
        assert_close(errors.a2, 0.5);
        assert_close(errors.a3, 0.5);
        // (0 + 0 + 2/4 + 8/8) / 4
        assert_close(errors.abs_rel, 0.375);
        // sqrt((0 + 0 + 4 + 64) / 4)
        assert_close(errors.rmse, 17f64.sqrt());
        // 2 * log10(2) / 4
        assert_close(errors.log_10, 2f64.log10() / 2.0);
    }

    #[test]
    fn compute_errors_perfect_prediction() {
        let device = Default::default();
        let gt = Tensor::<TestBackend, 4>::from_data(
            TensorData::from([[[[0.2, 0.4], [0.6, 0.8]]]]),
            &device,
        );

        let errors = compute_errors(gt.clone(), gt).unwrap();

        assert_close(errors.a1, 1.0);
        assert_close(errors.a3, 1.0);
        assert_close(errors.abs_rel, 0.0);
        assert_close(errors.rmse, 0.0);
        assert_close(errors.log_10, 0.0);
    }

    #[test]
    fn compute_errors_zeros_stay_finite() {
        let device = Default::default();
        let gt = Tensor::<TestBackend, 2>::from_data(TensorData::from([[0.0, 1.0]]), &device);
        let pred = Tensor::<TestBackend, 2>::from_data(TensorData::from([[1.0, 0.0]]), &device);

        let errors = compute_errors(gt, pred).unwrap();

        assert!(errors.abs_rel.is_finite());
        assert!(errors.log_10.is_finite());
        assert_close(errors.a1, 0.0);
    }

    #[test]
    fn depth_errors_display_and_json() {
        let errors = DepthErrors {
            a1: 0.5,
            a2: 0.75,
            a3: 1.0,
            abs_rel: 0.125,
            rmse: 2.0,
            log_10: 0.25,
        };

        assert_eq!(
            errors.to_string(),
            "a1=0.5000 a2=0.7500 a3=1.0000 abs_rel=0.1250 rmse=2.0000 log_10=0.2500"
        );
        let json = serde_json::to_string(&errors).unwrap();
        let back: DepthErrors = serde_json::from_str(&json).unwrap();
        assert_eq!(back, errors);
    }
}
