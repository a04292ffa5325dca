//! Multi-scale structural similarity.
//!
//! SSIM is evaluated on a pyramid obtained by 2×2 average pooling. The
//! contrast-structure term of every level but the last and the full SSIM of
//! the last level are combined as
//!
//! ```text
//! MS-SSIM = Π_{i<L-1} cs_i^{w_i} · ssim_{L-1}^{w_{L-1}}
//! ```
//!
//! Without `normalize`, negative `cs` values raised to fractional weights give
//! NaN; training uses the normalized variant `(x + 1) / 2`.

use burn::{
    config::Config,
    nn::pool::AvgPool2dConfig,
    tensor::{backend::Backend, Tensor},
};

use crate::ssim::{Ssim, SsimConfig};

/// Configuration for creating an [MS-SSIM](MsSsim) evaluator.
#[derive(Config, Debug)]
pub struct MsSsimConfig {
    /// Per-level exponents, finest level first.
    #[config(default = "vec![0.0448, 0.2856, 0.3001, 0.2363, 0.1333]")]
    pub weights: Vec<f64>,

    /// Map every level's ssim/cs to `(x + 1) / 2` before weighting.
    #[config(default = false)]
    pub normalize: bool,

    /// SSIM settings shared by every level.
    #[config(default = "SsimConfig::new()")]
    pub ssim: SsimConfig,
}

impl MsSsimConfig {
    /// Initialize [MS-SSIM](MsSsim).
    pub fn init(&self) -> MsSsim {
        assert!(
            !self.weights.is_empty(),
            "MsSsim needs at least one level weight"
        );
        assert!(
            self.weights.iter().all(|w| *w > 0.0),
            "MsSsim level weights must be positive, got {:?}",
            self.weights
        );

        MsSsim {
            weights: self.weights.clone(),
            normalize: self.normalize,
            ssim: self.ssim.init(),
        }
    }
}

/// Multi-scale SSIM evaluator.
#[derive(Clone, Debug)]
pub struct MsSsim {
    weights: Vec<f64>,
    normalize: bool,
    ssim: Ssim,
}

impl Default for MsSsim {
    fn default() -> Self {
        MsSsimConfig::new().init()
    }
}

impl MsSsim {
    /// Number of pyramid levels.
    pub fn levels(&self) -> usize {
        self.weights.len()
    }

    /// Smallest height and width accepted by [`MsSsim::compute`].
    pub fn min_side(&self) -> usize {
        1 << (self.levels() - 1)
    }

    /// Compute MS-SSIM of two image batches.
    ///
    /// # Shapes
    ///
    /// - img1: `[batch_size, channels, height, width]` (prediction)
    /// - img2: `[batch_size, channels, height, width]` (target)
    /// - output: `[1]`
    ///
    /// # Panics
    ///
    /// When height or width is below [`MsSsim::min_side`].
    pub fn compute<B: Backend>(&self, img1: Tensor<B, 4>, img2: Tensor<B, 4>) -> Tensor<B, 1> {
        let [_, _, height, width] = img1.dims();
        let min_side = self.min_side();
        assert!(
            height >= min_side && width >= min_side,
            "MsSsim with {} levels needs inputs of at least {min_side}x{min_side}, got {height}x{width}",
            self.levels()
        );

        let pool = AvgPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let last = self.levels() - 1;

        let (mut img1, mut img2) = (img1, img2);
        let mut result: Option<Tensor<B, 1>> = None;

        for (level, weight) in self.weights.iter().enumerate() {
            let out = self.ssim.compute(img1.clone(), img2.clone());
            let value = if level == last { out.ssim } else { out.cs };
            let value = if self.normalize {
                value.add_scalar(1.0).div_scalar(2.0)
            } else {
                value
            };
            let term = value.powf_scalar(*weight);

            result = Some(match result {
                Some(acc) => acc * term,
                None => term,
            });

            if level != last {
                img1 = pool.forward(img1);
                img2 = pool.forward(img2);
            }
        }

        // weights is non-empty, so the loop ran at least once
        result.unwrap_or_else(|| Tensor::ones([1], &img1.device()))
    }
}
