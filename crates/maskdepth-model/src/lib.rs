//! # maskdepth-model
//!
//! Model side of the mask/depth training loop: the [`DualHeadModel`] seam the
//! trainer is generic over, the default [`DualHeadNet`] encoder/decoder, and
//! the batch and output types passed between dataset, loss and trainer.
//!
//! ## Modules
//!
//! - `config`: [`DualHeadNetConfig`], the hyperparameters of the default model.
//! - `error`: [`ModelError`] and the [`ModelResult`] alias.
//! - `models`: convolutional building blocks and the [`DualHeadNet`] itself.
//! - `training`: [`MaskDepthBatch`], [`DualOutput`] and the [`DualHeadModel`] trait.

mod config;
mod error;
mod models;
pub mod training;

#[doc(inline)]
pub use config::DualHeadNetConfig;
#[doc(inline)]
pub use error::{ModelError, ModelResult};
#[doc(inline)]
pub use models::{
    blocks::{ConvBlock, ConvBlockConfig, LateralBlock, LateralBlockConfig, PredictionHead},
    dual_head::{DualHeadNet, DualHeadNetRecord},
};
#[doc(inline)]
pub use training::{DualHeadModel, DualOutput, MaskDepthBatch};

#[cfg(test)]
mod tests {
    use burn::backend::{Autodiff, NdArray};

    pub type TestBackend = NdArray;

    pub type TestAutodiffBackend = Autodiff<TestBackend>;
}
