//! SSIM (Structural Similarity Index) with a Gaussian window.
//!
//! ```text
//! SSIM = (2*μ₁*μ₂ + C₁)(2*σ₁₂ + C₂) / ((μ₁² + μ₂² + C₁)(σ₁² + σ₂² + C₂))
//! CS   = (2*σ₁₂ + C₂) / (σ₁² + σ₂² + C₂)
//! C₁   = (k₁·L)²,  C₂ = (k₂·L)²
//! ```
//!
//! The window is shrunk to the image when the image is smaller than
//! `window_size`, and the convolution is not padded, so only fully covered
//! positions contribute.

use burn::{
    config::Config,
    nn::loss::Reduction,
    tensor::{
        backend::Backend,
        cast::ToElement,
        module::conv2d,
        ops::ConvOptions,
        Tensor,
    },
};
use std::fmt;

/// Configuration for creating an [SSIM](Ssim) evaluator.
#[derive(Config, Debug)]
pub struct SsimConfig {
    /// Size of the Gaussian window. Default: 11
    #[config(default = 11)]
    pub window_size: usize,

    /// Standard deviation of the Gaussian window. Default: 1.5
    #[config(default = 1.5)]
    pub sigma: f64,

    /// Luminance stability factor. Default: 0.01
    #[config(default = 0.01)]
    pub k1: f64,

    /// Contrast stability factor. Default: 0.03
    #[config(default = 0.03)]
    pub k2: f64,

    /// Dynamic range of the pixel values. Detected from the prediction when `None`.
    #[config(default = "None")]
    pub value_range: Option<f64>,
}

impl SsimConfig {
    /// Initialize [SSIM](Ssim).
    pub fn init(&self) -> Ssim {
        self.assertions();
        Ssim {
            window_size: self.window_size,
            sigma: self.sigma,
            k1: self.k1,
            k2: self.k2,
            value_range: self.value_range,
        }
    }

    fn assertions(&self) {
        assert!(
            self.window_size > 0 && self.window_size % 2 == 1,
            "Window size for Ssim must be positive and odd, got {}",
            self.window_size
        );
        assert!(
            self.sigma > 0.0,
            "Sigma for Ssim must be positive, got {}",
            self.sigma
        );
        assert!(
            self.k1 > 0.0 && self.k2 > 0.0,
            "Stability factors for Ssim must be positive, got k1={} k2={}",
            self.k1,
            self.k2
        );
        if let Some(range) = self.value_range {
            assert!(
                range > 0.0,
                "Value range for Ssim must be positive, got {range}"
            );
        }
    }
}

/// Mean SSIM and mean contrast-structure term of a pair of image batches.
#[derive(Debug, Clone)]
pub struct SsimOutput<B: Backend> {
    /// Mean SSIM over batch, channels and valid positions. Shape `[1]`.
    pub ssim: Tensor<B, 1>,
    /// Mean contrast-structure term. Shape `[1]`.
    pub cs: Tensor<B, 1>,
}

/// Structural similarity between two image batches.
#[derive(Clone, Debug)]
pub struct Ssim {
    window_size: usize,
    sigma: f64,
    k1: f64,
    k2: f64,
    value_range: Option<f64>,
}

impl Default for Ssim {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Ssim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ssim {{window_size: {}, sigma: {}, k1: {}, k2: {}",
            self.window_size, self.sigma, self.k1, self.k2
        )?;
        match self.value_range {
            Some(range) => write!(f, ", value_range: {range}}}"),
            None => write!(f, ", value_range: auto}}"),
        }
    }
}

impl Ssim {
    /// Create SSIM with the default configuration.
    pub fn new() -> Self {
        SsimConfig::new().init()
    }

    /// Compute mean SSIM and contrast-structure over the whole batch.
    ///
    /// # Shapes
    ///
    /// - img1: `[batch_size, channels, height, width]` (prediction)
    /// - img2: `[batch_size, channels, height, width]` (target)
    pub fn compute<B: Backend>(&self, img1: Tensor<B, 4>, img2: Tensor<B, 4>) -> SsimOutput<B> {
        let (ssim_map, cs_map) = self.maps(img1, img2);
        SsimOutput {
            ssim: ssim_map.mean(),
            cs: cs_map.mean(),
        }
    }

    /// Loss `(1 - ssim) / 2` with reduction over the batch.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, channels, height, width]`
    /// - targets: `[batch_size, channels, height, width]`
    /// - output: `[1]`
    pub fn forward<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
        reduction: Reduction,
    ) -> Tensor<B, 1> {
        let loss = self.forward_no_reduction(predictions, targets);
        match reduction {
            Reduction::Mean | Reduction::Auto => loss.mean(),
            Reduction::Sum => loss.sum(),
        }
    }

    /// Per-sample loss `(1 - ssim) / 2`.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, channels, height, width]`
    /// - targets: `[batch_size, channels, height, width]`
    /// - output: `[batch_size]`
    pub fn forward_no_reduction<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> Tensor<B, 1> {
        let [batch_size, _, _, _] = predictions.dims();
        let (ssim_map, _) = self.maps(predictions, targets);

        let per_sample: Tensor<B, 1> = ssim_map
            .reshape([batch_size as i32, -1])
            .mean_dim(1)
            .squeeze(1);

        per_sample.neg().add_scalar(1.0).div_scalar(2.0)
    }

    /// Dynamic range `L` used for the stability constants.
    ///
    /// Detected as `max - min` where max is 255 when the prediction exceeds 128
    /// (else 1) and min is -1 when the prediction goes below -0.5 (else 0).
    pub fn dynamic_range<B: Backend>(&self, predictions: &Tensor<B, 4>) -> f64 {
        if let Some(range) = self.value_range {
            return range;
        }

        let max_val = if predictions.clone().max().into_scalar().to_f64() > 128.0 {
            255.0
        } else {
            1.0
        };
        let min_val = if predictions.clone().min().into_scalar().to_f64() < -0.5 {
            -1.0
        } else {
            0.0
        };

        max_val - min_val
    }

    fn maps<B: Backend>(&self, img1: Tensor<B, 4>, img2: Tensor<B, 4>) -> (Tensor<B, 4>, Tensor<B, 4>) {
        self.assertions(&img1, &img2);

        let [_, channels, height, width] = img1.dims();
        let device = img1.device();

        let real_size = self.window_size.min(height).min(width);
        let window = self.create_window::<B>(real_size, channels, &device);
        let options = ConvOptions::new([1, 1], [0, 0], [1, 1], channels);
        let filter = |x: Tensor<B, 4>| conv2d(x, window.clone(), None, options.clone());

        let range = self.dynamic_range(&img1);
        let c1 = (self.k1 * range).powi(2);
        let c2 = (self.k2 * range).powi(2);

        let mu1 = filter(img1.clone());
        let mu2 = filter(img2.clone());

        let mu1_sq = mu1.clone().powi_scalar(2);
        let mu2_sq = mu2.clone().powi_scalar(2);
        let mu1_mu2 = mu1 * mu2;

        let sigma1_sq = filter(img1.clone().powi_scalar(2)) - mu1_sq.clone();
        let sigma2_sq = filter(img2.clone().powi_scalar(2)) - mu2_sq.clone();
        let sigma12 = filter(img1 * img2) - mu1_mu2.clone();

        let cs_map = sigma12.mul_scalar(2.0).add_scalar(c2) / (sigma1_sq + sigma2_sq).add_scalar(c2);
        let luminance = mu1_mu2.mul_scalar(2.0).add_scalar(c1) / (mu1_sq + mu2_sq).add_scalar(c1);
        let ssim_map = luminance * cs_map.clone();

        (ssim_map, cs_map)
    }

    /// Normalized 2D Gaussian window, shape `[channels, 1, size, size]`.
    fn create_window<B: Backend>(
        &self,
        size: usize,
        channels: usize,
        device: &B::Device,
    ) -> Tensor<B, 4> {
        let center = (size / 2) as f64;
        let gauss: Vec<f64> = (0..size)
            .map(|i| {
                let x = i as f64 - center;
                (-(x * x) / (2.0 * self.sigma * self.sigma)).exp()
            })
            .collect();
        let sum: f64 = gauss.iter().sum();
        let gauss: Vec<f32> = gauss.iter().map(|v| (v / sum) as f32).collect();

        let window_1d = Tensor::<B, 1>::from_floats(gauss.as_slice(), device).unsqueeze::<2>();
        let window_2d = window_1d.clone().transpose().matmul(window_1d);

        window_2d
            .unsqueeze::<4>()
            .repeat(&[channels, 1, 1, 1])
    }

    fn assertions<B: Backend>(&self, predictions: &Tensor<B, 4>, targets: &Tensor<B, 4>) {
        let pred_dims = predictions.dims();
        let target_dims = targets.dims();
        assert_eq!(
            pred_dims, target_dims,
            "Shape of predictions ({pred_dims:?}) must match targets ({target_dims:?})"
        );
    }
}

#[cfg(test)]
mod tests {
    use burn::tensor::{Distribution, TensorData};

    use super::*;
    use crate::tests::TestBackend;

    fn random_image(shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::random(shape, Distribution::Uniform(0.0, 1.0), &Default::default())
    }

    #[test]
    fn ssim_identical_images_is_one() {
        let img = random_image([2, 1, 16, 16]);

        let out = Ssim::new().compute(img.clone(), img);

        let ssim = out.ssim.into_scalar().to_f64();
        let cs = out.cs.into_scalar().to_f64();
        assert!((ssim - 1.0).abs() < 1e-4, "ssim = {ssim}");
        assert!((cs - 1.0).abs() < 1e-4, "cs = {cs}");
    }

    #[test]
    fn ssim_different_images_is_below_one() {
        let img1 = random_image([1, 3, 16, 16]);
        let img2 = random_image([1, 3, 16, 16]);

        let ssim = Ssim::new().compute(img1, img2).ssim.into_scalar().to_f64();

        assert!(ssim < 0.9, "ssim = {ssim}");
    }

    #[test]
    fn ssim_loss_is_per_sample_and_bounded() {
        let img1 = random_image([3, 1, 12, 12]);
        let img2 = random_image([3, 1, 12, 12]);
        let ssim = Ssim::new();

        let per_sample = ssim.forward_no_reduction(img1.clone(), img2.clone());
        let mean = ssim.forward(img1.clone(), img2.clone(), Reduction::Mean);
        let sum = ssim.forward(img1, img2, Reduction::Sum);

        assert_eq!(per_sample.dims(), [3]);
        let values = per_sample.into_data().to_vec::<f32>().unwrap();
        for value in values {
            assert!((0.0..=1.0).contains(&value), "loss = {value}");
        }
        let mean = mean.into_scalar().to_f64();
        let sum = sum.into_scalar().to_f64();
        assert!((sum - 3.0 * mean).abs() < 1e-4);
    }

    #[test]
    fn ssim_window_shrinks_to_small_images() {
        let img1 = random_image([1, 1, 4, 6]);
        let img2 = random_image([1, 1, 4, 6]);

        let ssim = Ssim::new().compute(img1, img2).ssim.into_scalar().to_f64();

        assert!(ssim.is_finite());
    }

    #[test]
    fn dynamic_range_detection() {
        let device = Default::default();
        let ssim = Ssim::new();

        let unit = Tensor::<TestBackend, 4>::from_data(TensorData::from([[[[0.0, 1.0]]]]), &device);
        let bytes =
            Tensor::<TestBackend, 4>::from_data(TensorData::from([[[[0.0, 200.0]]]]), &device);
        let signed =
            Tensor::<TestBackend, 4>::from_data(TensorData::from([[[[-1.0, 1.0]]]]), &device);

        assert_eq!(ssim.dynamic_range(&unit), 1.0);
        assert_eq!(ssim.dynamic_range(&bytes), 255.0);
        assert_eq!(ssim.dynamic_range(&signed), 2.0);

        let fixed = SsimConfig::new().with_value_range(Some(4.0)).init();
        assert_eq!(fixed.dynamic_range(&bytes), 4.0);
    }

    #[test]
    fn ssim_byte_range_identical_images_is_one() {
        let img = random_image([1, 1, 16, 16]).mul_scalar(255.0);

        let ssim = Ssim::new().compute(img.clone(), img).ssim.into_scalar().to_f64();

        assert!((ssim - 1.0).abs() < 1e-4, "ssim = {ssim}");
    }

    #[test]
    #[should_panic = "Window size for Ssim must be positive and odd"]
    fn ssim_config_even_window_panics() {
        let _ = SsimConfig::new().with_window_size(10).init();
    }

    #[test]
    #[should_panic = "Shape of predictions"]
    fn ssim_mismatched_shapes_panic() {
        let _ = Ssim::new().compute(random_image([1, 1, 8, 8]), random_image([1, 1, 8, 9]));
    }

    #[test]
    fn ssim_display_shows_parameters() {
        let ssim = SsimConfig::new().with_value_range(Some(1.0)).init();

        assert_eq!(
            format!("{ssim}"),
            "Ssim {window_size: 11, sigma: 1.5, k1: 0.01, k2: 0.03, value_range: 1}"
        );
    }
}
