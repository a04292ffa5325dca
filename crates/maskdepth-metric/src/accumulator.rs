//! Streaming accumulation of error statistics over an epoch.

use std::f64::consts::LN_10;

use burn::tensor::{backend::Backend, Tensor};
use maskdepth_model::{DualOutput, MaskDepthBatch};
use serde::{Deserialize, Serialize};

use crate::errors::{DepthErrors, DEFAULT_MIN_VALUE};

const THRESHOLD: f64 = 1.25;

/// Running sums behind [`DepthErrors`].
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorAccumulator {
    min_value: f64,
    count: usize,
    a1: f64,
    a2: f64,
    a3: f64,
    abs_rel: f64,
    squared: f64,
    log_10: f64,
}

impl Default for ErrorAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorAccumulator {
    /// Accumulator clamping values below at [`DEFAULT_MIN_VALUE`].
    pub fn new() -> Self {
        Self::with_min_value(DEFAULT_MIN_VALUE)
    }

    pub fn with_min_value(min_value: f64) -> Self {
        Self {
            min_value,
            count: 0,
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
            abs_rel: 0.0,
            squared: 0.0,
            log_10: 0.0,
        }
    }

    /// Number of pixels seen so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Add every element of a prediction/ground-truth pair.
    ///
    /// # Panics
    ///
    /// When the shapes differ.
    pub fn update<B: Backend, const D: usize>(
        &mut self,
        ground_truth: Tensor<B, D>,
        prediction: Tensor<B, D>,
    ) {
        let gt_dims = ground_truth.dims();
        let pred_dims = prediction.dims();
        assert_eq!(
            gt_dims, pred_dims,
            "Shape of ground truth ({gt_dims:?}) must match prediction ({pred_dims:?})"
        );

        let count = ground_truth.shape().num_elements();
        if count == 0 {
            return;
        }

        let gt = ground_truth.clamp_min(self.min_value);
        let pred = prediction.clamp_min(self.min_value);

        let thresh = (gt.clone() / pred.clone()).max_pair(pred.clone() / gt.clone());
        let within = |bound: f64| thresh.clone().lower_elem(bound).float().sum();
        let diff = gt.clone() - pred.clone();

        let sums = Tensor::cat(
            vec![
                within(THRESHOLD),
                within(THRESHOLD.powi(2)),
                within(THRESHOLD.powi(3)),
                (diff.clone().abs() / gt.clone()).sum(),
                diff.powi_scalar(2).sum(),
                (gt.log() - pred.log()).abs().sum(),
            ],
            0,
        );
        let sums: Vec<f64> = sums.into_data().iter::<f64>().collect();

        self.count += count;
        self.a1 += sums[0];
        self.a2 += sums[1];
        self.a3 += sums[2];
        self.abs_rel += sums[3];
        self.squared += sums[4];
        self.log_10 += sums[5] / LN_10;
    }

    /// Statistics over everything seen so far, `None` before the first pixel.
    pub fn finish(&self) -> Option<DepthErrors> {
        if self.count == 0 {
            return None;
        }

        let n = self.count as f64;
        Some(DepthErrors {
            a1: self.a1 / n,
            a2: self.a2 / n,
            a3: self.a3 / n,
            abs_rel: self.abs_rel / n,
            rmse: (self.squared / n).sqrt(),
            log_10: self.log_10 / n,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::with_min_value(self.min_value);
    }
}

/// Error statistics of both heads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualErrors {
    pub mask: Option<DepthErrors>,
    pub depth: Option<DepthErrors>,
}

/// One [`ErrorAccumulator`] per prediction head.
#[derive(Debug, Clone, Default)]
pub struct DualErrorAccumulator {
    mask: ErrorAccumulator,
    depth: ErrorAccumulator,
}

impl DualErrorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the predictions of one batch.
    pub fn update<B: Backend>(&mut self, output: &DualOutput<B>, batch: &MaskDepthBatch<B>) {
        self.mask.update(batch.mask.clone(), output.mask.clone());
        self.depth.update(batch.depth.clone(), output.depth.clone());
    }

    pub fn finish(&self) -> DualErrors {
        DualErrors {
            mask: self.mask.finish(),
            depth: self.depth.finish(),
        }
    }

    pub fn reset(&mut self) {
        self.mask.reset();
        self.depth.reset();
    }
}
