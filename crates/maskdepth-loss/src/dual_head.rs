//! Composite loss over the mask and depth heads.

use burn::{
    config::Config,
    tensor::{backend::Backend, Tensor},
};
use maskdepth_model::{DualOutput, MaskDepthBatch};

use crate::head::{HeadLoss, HeadLossConfig, StructuralKind};

/// Configuration for creating a [`DualHeadLoss`].
///
/// The defaults are the training setup (normalized MS-SSIM on both heads);
/// [`DualHeadLossConfig::for_evaluation`] derives the evaluation setup.
#[derive(Config, Debug)]
pub struct DualHeadLossConfig {
    /// Loss of the mask head.
    #[config(default = "HeadLossConfig::new()")]
    pub mask: HeadLossConfig,

    /// Loss of the depth head.
    #[config(default = "HeadLossConfig::new()")]
    pub depth: HeadLossConfig,

    /// Weight of the mask head loss. Default: 2.0
    #[config(default = 2.0)]
    pub mask_weight: f64,

    /// Weight of the depth head loss. Default: 1.0
    #[config(default = 1.0)]
    pub depth_weight: f64,
}

impl DualHeadLossConfig {
    /// Same loss with plain SSIM as the structural term of both heads.
    pub fn for_evaluation(&self) -> Self {
        let mut config = self.clone();
        config.mask.structural = StructuralKind::Ssim;
        config.depth.structural = StructuralKind::Ssim;
        config
    }

    /// Initialize a [`DualHeadLoss`].
    pub fn init(&self) -> DualHeadLoss {
        assert!(
            self.mask_weight >= 0.0 && self.depth_weight >= 0.0,
            "DualHeadLoss weights must be non-negative, got mask={} depth={}",
            self.mask_weight,
            self.depth_weight
        );

        DualHeadLoss {
            mask: self.mask.init(),
            depth: self.depth.init(),
            mask_weight: self.mask_weight,
            depth_weight: self.depth_weight,
        }
    }
}

/// Loss values of one batch, each of shape `[1]`.
#[derive(Debug, Clone)]
pub struct DualLoss<B: Backend> {
    /// `mask_weight * mask + depth_weight * depth`.
    pub total: Tensor<B, 1>,
    /// Mask head loss.
    pub mask: Tensor<B, 1>,
    /// Depth head loss.
    pub depth: Tensor<B, 1>,
}

/// Weighted sum of the mask and depth head losses.
#[derive(Clone, Debug)]
pub struct DualHeadLoss {
    mask: HeadLoss,
    depth: HeadLoss,
    mask_weight: f64,
    depth_weight: f64,
}

impl DualHeadLoss {
    /// Compute the loss of a model output against its batch targets.
    pub fn forward<B: Backend>(&self, output: &DualOutput<B>, batch: &MaskDepthBatch<B>) -> DualLoss<B> {
        self.forward_heads(
            output.mask.clone(),
            batch.mask.clone(),
            output.depth.clone(),
            batch.depth.clone(),
        )
    }

    /// Compute the loss from the four head tensors.
    ///
    /// # Shapes
    ///
    /// - mask_pred, mask: `[batch_size, 1, height, width]`
    /// - depth_pred, depth: `[batch_size, 1, height, width]`
    pub fn forward_heads<B: Backend>(
        &self,
        mask_pred: Tensor<B, 4>,
        mask: Tensor<B, 4>,
        depth_pred: Tensor<B, 4>,
        depth: Tensor<B, 4>,
    ) -> DualLoss<B> {
        let mask = self.mask.forward(mask_pred, mask).total;
        let depth = self.depth.forward(depth_pred, depth).total;

        let total = mask.clone().mul_scalar(self.mask_weight)
            + depth.clone().mul_scalar(self.depth_weight);

        DualLoss { total, mask, depth }
    }
}
