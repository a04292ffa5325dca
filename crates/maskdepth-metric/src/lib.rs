//! # maskdepth metrics
//!
//! Quantitative error statistics comparing predicted maps with their ground truth:
//!
//! | name      | definition                                   |
//! |-----------|----------------------------------------------|
//! | `a1`      | `mean(max(gt/pred, pred/gt) < 1.25)`         |
//! | `a2`      | `mean(max(gt/pred, pred/gt) < 1.25²)`        |
//! | `a3`      | `mean(max(gt/pred, pred/gt) < 1.25³)`        |
//! | `abs_rel` | `mean(abs(gt - pred) / gt)`                  |
//! | `rmse`    | `sqrt(mean((gt - pred)²))`                   |
//! | `log_10`  | `mean(abs(log10(gt) - log10(pred)))`         |
//!
//! Every statistic is a mean over all pixels, so an epoch can be evaluated
//! batch by batch with [`ErrorAccumulator`] instead of stacking every
//! prediction in memory.

mod accumulator;
mod errors;

pub use accumulator::{DualErrorAccumulator, DualErrors, ErrorAccumulator};
pub use errors::{compute_errors, DepthErrors, DEFAULT_MIN_VALUE};

#[cfg(test)]
mod tests {
    pub type TestBackend = burn::backend::NdArray;
}
