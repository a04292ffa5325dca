//! # DualHeadNet
//!
//! A compact U-Net style network that predicts a segmentation mask and a depth
//! map from the same composite `fgbg` image.
//!
//! The encoder applies one [`ConvBlock`] per level with 2x2 max pooling in
//! between. The decoder walks back up: the coarser feature is upsampled
//! bilinearly to the skip feature's resolution, the skip feature is projected
//! by a [`LateralBlock`] and added, and a [`ConvBlock`] reduces the channels.
//! Two [`PredictionHead`]s share the final full-resolution feature map.

use burn::{
    nn::pool::{MaxPool2d, MaxPool2dConfig},
    prelude::*,
    tensor::{
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

use super::blocks::{
    ConvBlock, ConvBlockConfig, LateralBlock, LateralBlockConfig, PredictionHead,
};
use crate::{
    config::DualHeadNetConfig,
    error::{ModelError, ModelResult},
    training::{DualHeadModel, DualOutput},
};

impl DualHeadNetConfig {
    /// Initializes a new [`DualHeadNet`] on the given device.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfiguration`] if the configuration is inconsistent.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> ModelResult<DualHeadNet<B>> {
        self.validate()?;
        let channels = self.channels();

        let mut encoder = Vec::with_capacity(self.levels + 1);
        encoder.push(
            ConvBlockConfig::new(self.in_channels, channels[0])
                .with_batch_size(self.batch_size)
                .init(device),
        );
        for level in 1..=self.levels {
            encoder.push(
                ConvBlockConfig::new(channels[level - 1], channels[level])
                    .with_batch_size(self.batch_size)
                    .init(device),
            );
        }

        // Index `i` of the decoder vectors brings level `i + 1` back to level `i`.
        let laterals = (0..self.levels)
            .map(|level| LateralBlockConfig::new(channels[level], channels[level + 1]).init(device))
            .collect();
        let decoder = (0..self.levels)
            .map(|level| {
                ConvBlockConfig::new(channels[level + 1], channels[level])
                    .with_batch_size(self.batch_size)
                    .init(device)
            })
            .collect();

        Ok(DualHeadNet {
            encoder,
            laterals,
            decoder,
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            mask_head: PredictionHead::new(channels[0], device),
            depth_head: PredictionHead::new(channels[0], device),
            in_channels: self.in_channels,
            size_multiple: self.size_multiple(),
        })
    }
}

/// Encoder/decoder with a mask head and a depth head.
///
/// # Shapes
///   - input: `[batch_size, in_channels, height, width]`
///   - mask, depth: `[batch_size, 1, height, width]`
#[derive(Module, Debug)]
pub struct DualHeadNet<B: Backend> {
    encoder: Vec<ConvBlock<B>>,
    laterals: Vec<LateralBlock<B>>,
    decoder: Vec<ConvBlock<B>>,
    pool: MaxPool2d,
    mask_head: PredictionHead<B>,
    depth_head: PredictionHead<B>,
    in_channels: usize,
    size_multiple: usize,
}

impl<B: Backend> DualHeadNet<B> {
    /// Runs the network after checking the input shape.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInputShape`] if the channel count does not match
    /// the configuration or the spatial size is not a multiple of `2^levels`.
    pub fn try_forward(&self, fgbg: Tensor<B, 4>) -> ModelResult<DualOutput<B>> {
        let [batch, channels, height, width] = fgbg.dims();
        if channels != self.in_channels
            || height % self.size_multiple != 0
            || width % self.size_multiple != 0
            || height == 0
            || width == 0
        {
            return Err(ModelError::InvalidInputShape {
                expected: format!(
                    "[N, {}, H, W] with H and W non-zero multiples of {}",
                    self.in_channels, self.size_multiple
                ),
                actual: format!("[{batch}, {channels}, {height}, {width}]"),
            });
        }
        Ok(self.forward(fgbg))
    }

    /// Runs the network without validating the input.
    pub fn forward(&self, fgbg: Tensor<B, 4>) -> DualOutput<B> {
        let mut skips = Vec::with_capacity(self.laterals.len());

        let mut x = self.encoder[0].forward(fgbg);
        for block in &self.encoder[1..] {
            let pooled = self.pool.forward(x.clone());
            skips.push(x);
            x = block.forward(pooled);
        }

        for (level, skip) in skips.into_iter().enumerate().rev() {
            let [_, _, height, width] = skip.dims();
            let upsampled = interpolate(
                x,
                [height, width],
                InterpolateOptions::new(InterpolateMode::Bilinear),
            );
            x = self.decoder[level].forward(upsampled + self.laterals[level].forward(skip));
        }

        DualOutput::new(self.mask_head.forward(x.clone()), self.depth_head.forward(x))
    }
}

impl<B: Backend> DualHeadModel<B> for DualHeadNet<B> {
    fn forward_dual(&self, fgbg: Tensor<B, 4>) -> DualOutput<B> {
        self.forward(fgbg)
    }
}
