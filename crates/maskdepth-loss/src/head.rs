//! Loss of a single prediction head.

use burn::{
    config::Config,
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::{
    ms_ssim::{MsSsim, MsSsimConfig},
    pixel::PixelCriterion,
    ssim::{Ssim, SsimConfig},
};

/// Structural similarity measure used by a [`HeadLoss`].
#[derive(Config, Debug, Copy, PartialEq, Eq)]
pub enum StructuralKind {
    /// Single-scale SSIM.
    Ssim,
    /// Multi-scale SSIM.
    MsSsim,
}

/// Configuration for creating a [`HeadLoss`].
#[derive(Config, Debug)]
pub struct HeadLossConfig {
    /// Pixel criterion. The pixel term is zero when absent.
    #[config(default = "Some(PixelCriterion::L1)")]
    pub criterion: Option<PixelCriterion>,

    /// Structural similarity measure.
    #[config(default = "StructuralKind::MsSsim")]
    pub structural: StructuralKind,

    /// Weight of the structural term. Default: 0.84
    #[config(default = 0.84)]
    pub structural_weight: f64,

    /// Weight of the pixel term. Default: 0.16
    #[config(default = 0.16)]
    pub pixel_weight: f64,

    /// SSIM settings, also used at every MS-SSIM level.
    #[config(default = "SsimConfig::new()")]
    pub ssim: SsimConfig,

    /// Normalize MS-SSIM levels to `(x + 1) / 2`.
    #[config(default = true)]
    pub normalize: bool,
}

impl HeadLossConfig {
    /// Initialize a [`HeadLoss`].
    pub fn init(&self) -> HeadLoss {
        assert!(
            self.structural_weight >= 0.0 && self.pixel_weight >= 0.0,
            "HeadLoss weights must be non-negative, got structural={} pixel={}",
            self.structural_weight,
            self.pixel_weight
        );

        let structural = match self.structural {
            StructuralKind::Ssim => Structural::Ssim(self.ssim.init()),
            StructuralKind::MsSsim => Structural::MsSsim(
                MsSsimConfig::new()
                    .with_normalize(self.normalize)
                    .with_ssim(self.ssim.clone())
                    .init(),
            ),
        };

        HeadLoss {
            criterion: self.criterion,
            structural,
            structural_weight: self.structural_weight,
            pixel_weight: self.pixel_weight,
        }
    }
}

#[derive(Clone, Debug)]
enum Structural {
    Ssim(Ssim),
    MsSsim(MsSsim),
}

impl Structural {
    fn similarity<B: Backend>(&self, pred: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 1> {
        match self {
            Self::Ssim(ssim) => ssim.compute(pred, target).ssim,
            Self::MsSsim(ms_ssim) => ms_ssim.compute(pred, target),
        }
    }
}

/// Terms of a head loss.
#[derive(Debug, Clone)]
pub struct HeadLossOutput<B: Backend> {
    /// `structural_weight * structural + pixel_weight * pixel`, shape `[1]`.
    pub total: Tensor<B, 1>,
    /// `clamp((1 - S) * 0.5, 0, 1)`, shape `[1]`.
    pub structural: Tensor<B, 1>,
    /// Pixel criterion value, `None` without a criterion.
    pub pixel: Option<Tensor<B, 1>>,
}

/// Weighted structural + pixel loss for one prediction head.
#[derive(Clone, Debug)]
pub struct HeadLoss {
    criterion: Option<PixelCriterion>,
    structural: Structural,
    structural_weight: f64,
    pixel_weight: f64,
}

impl HeadLoss {
    /// Compute the head loss.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, channels, height, width]`
    /// - targets: `[batch_size, channels, height, width]`
    pub fn forward<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> HeadLossOutput<B> {
        let similarity = self
            .structural
            .similarity(predictions.clone(), targets.clone());
        let structural = similarity
            .neg()
            .add_scalar(1.0)
            .mul_scalar(0.5)
            .clamp(0.0, 1.0);

        let pixel = self
            .criterion
            .map(|criterion| criterion.forward(predictions, targets, Reduction::Mean));

        let weighted = structural.clone().mul_scalar(self.structural_weight);
        let total = match &pixel {
            Some(pixel) => weighted + pixel.clone().mul_scalar(self.pixel_weight),
            None => weighted,
        };

        HeadLossOutput {
            total,
            structural,
            pixel,
        }
    }
}
