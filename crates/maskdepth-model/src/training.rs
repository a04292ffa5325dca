//! Batch and output structures shared by the dataset, loss and trainer crates.
//!
//! Keeping them next to the model avoids circular dependencies: the dataset
//! produces [`MaskDepthBatch`], models produce [`DualOutput`], and the loss
//! and metric crates consume both.

use burn::{
    prelude::*,
    tensor::backend::{AutodiffBackend, Backend},
};
use derive_new::new;

/// One batch of composite images with their ground-truth mask and depth map.
#[derive(new, Debug, Clone)]
pub struct MaskDepthBatch<B: Backend> {
    /// Composite foreground/background images, `[N, 3, H, W]`.
    pub fgbg: Tensor<B, 4>,
    /// Ground-truth segmentation masks, `[N, 1, H, W]`.
    pub mask: Tensor<B, 4>,
    /// Ground-truth depth maps, `[N, 1, H, W]`.
    pub depth: Tensor<B, 4>,
}

impl<B: Backend> MaskDepthBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.fgbg.dims()[0]
    }
}

impl<B: AutodiffBackend> MaskDepthBatch<B> {
    /// Drops the autodiff wrapper from every tensor.
    pub fn inner(self) -> MaskDepthBatch<B::InnerBackend> {
        MaskDepthBatch {
            fgbg: self.fgbg.inner(),
            mask: self.mask.inner(),
            depth: self.depth.inner(),
        }
    }
}

/// The two predictions of a dual-head model.
#[derive(new, Debug, Clone)]
pub struct DualOutput<B: Backend> {
    /// Predicted mask, `[N, 1, H, W]`.
    pub mask: Tensor<B, 4>,
    /// Predicted depth map, `[N, 1, H, W]`.
    pub depth: Tensor<B, 4>,
}

impl<B: Backend> DualOutput<B> {
    pub fn detach(self) -> Self {
        Self {
            mask: self.mask.detach(),
            depth: self.depth.detach(),
        }
    }
}

impl<B: AutodiffBackend> DualOutput<B> {
    /// Drops the autodiff wrapper, detaching both predictions from the graph.
    pub fn inner(self) -> DualOutput<B::InnerBackend> {
        DualOutput {
            mask: self.mask.inner(),
            depth: self.depth.inner(),
        }
    }
}

/// A model mapping a composite image to a mask and a depth prediction.
///
/// The trainer is generic over this trait, so any Burn module with the same
/// input/output contract can be trained in place of [`DualHeadNet`](crate::DualHeadNet).
pub trait DualHeadModel<B: Backend> {
    fn forward_dual(&self, fgbg: Tensor<B, 4>) -> DualOutput<B>;
}
