//! Convolutional building blocks of the dual-head model.
//!
//! [`ConvBlock`] is the encoder/decoder workhorse (two 3x3 convolutions, each
//! followed by normalization and ReLU), [`LateralBlock`] projects a skip
//! feature onto the decoder's channel count, and [`PredictionHead`] maps the
//! final feature map to a single sigmoid-activated channel.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
    tensor::activation::sigmoid,
};

/// Pass-through used in place of BatchNorm when training with single-sample batches.
#[derive(Module, Debug, Clone)]
pub struct Identity;

impl Identity {
    pub const fn new() -> Self {
        Self {}
    }

    pub fn forward<B: Backend>(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        input
    }
}

/// Conditional normalization layer that switches between BatchNorm and Identity.
///
/// Uses BatchNorm when batch_size > 1, otherwise Identity.
#[derive(Module, Debug)]
pub enum NormLayer<B: Backend> {
    BatchNorm(BatchNorm<B, 2>),
    Identity(Identity),
}

impl<B: Backend> NormLayer<B> {
    pub fn new(channels: usize, batch_size: usize, device: &Device<B>) -> Self {
        if batch_size > 1 {
            Self::BatchNorm(BatchNormConfig::new(channels).init(device))
        } else {
            Self::Identity(Identity::new())
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            Self::BatchNorm(bn) => bn.forward(x),
            Self::Identity(identity) => identity.forward(x),
        }
    }
}

/// Configuration for the [`ConvBlock`] module.
#[derive(Config, Debug)]
pub struct ConvBlockConfig {
    /// Number of input channels.
    in_channels: usize,
    /// Number of output channels.
    out_channels: usize,
    /// Batch size for conditional BatchNorm usage.
    #[config(default = "4")]
    batch_size: usize,
}

impl ConvBlockConfig {
    pub fn init<B: Backend>(&self, device: &Device<B>) -> ConvBlock<B> {
        let conv_in = Conv2dConfig::new([self.in_channels, self.out_channels], [3, 3])
            .with_stride([1, 1])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let conv_out = Conv2dConfig::new([self.out_channels, self.out_channels], [3, 3])
            .with_stride([1, 1])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);

        ConvBlock {
            conv_in,
            norm_in: NormLayer::new(self.out_channels, self.batch_size, device),
            conv_out,
            norm_out: NormLayer::new(self.out_channels, self.batch_size, device),
            relu: Relu::new(),
        }
    }
}

/// Two 3x3 convolutions with normalization and ReLU.
///
/// # Shapes
///   - input: `[batch_size, in_channels, height, width]`
///   - output: `[batch_size, out_channels, height, width]`
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv_in: Conv2d<B>,
    norm_in: NormLayer<B>,
    conv_out: Conv2d<B>,
    norm_out: NormLayer<B>,
    relu: Relu,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv_in.forward(x);
        let x = self.norm_in.forward(x);
        let x = self.relu.forward(x);

        let x = self.conv_out.forward(x);
        let x = self.norm_out.forward(x);
        self.relu.forward(x)
    }
}

/// Configuration for the [`LateralBlock`] module.
#[derive(Config, Debug)]
pub struct LateralBlockConfig {
    /// Number of input channels.
    in_channels: usize,
    /// Number of output channels.
    out_channels: usize,
}

impl LateralBlockConfig {
    pub fn init<B: Backend>(&self, device: &Device<B>) -> LateralBlock<B> {
        LateralBlock {
            conv: Conv2dConfig::new([self.in_channels, self.out_channels], [1, 1])
                .with_stride([1, 1])
                .with_padding(PaddingConfig2d::Valid)
                .init(device),
        }
    }
}

/// A lateral connection: a single 1x1 convolution applied to a skip feature.
#[derive(Module, Debug)]
pub struct LateralBlock<B: Backend> {
    conv: Conv2d<B>,
}

impl<B: Backend> LateralBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv.forward(x)
    }
}

/// A 1x1 convolution to one channel followed by a sigmoid.
#[derive(Module, Debug)]
pub struct PredictionHead<B: Backend> {
    conv: Conv2d<B>,
}

impl<B: Backend> PredictionHead<B> {
    pub fn new(in_channels: usize, device: &Device<B>) -> Self {
        Self {
            conv: Conv2dConfig::new([in_channels, 1], [1, 1])
                .with_padding(PaddingConfig2d::Valid)
                .init(device),
        }
    }

    /// Output values lie in `[0, 1]`.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        sigmoid(self.conv.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use burn::tensor::cast::ToElement;

    use super::*;
    use crate::tests::TestBackend;

    #[test]
    fn conv_block_changes_channels_and_keeps_resolution() {
        let device = Default::default();
        let block = ConvBlockConfig::new(3, 8).init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 4>::ones([2, 3, 8, 8], &device);
        let y = block.forward(x);

        assert_eq!(y.dims(), [2, 8, 8, 8]);
    }

    #[test]
    fn single_sample_batch_uses_identity_norm() {
        let device = Default::default();
        let norm = NormLayer::<TestBackend>::new(4, 1, &device);
        assert!(matches!(norm, NormLayer::Identity(_)));

        let norm = NormLayer::<TestBackend>::new(4, 2, &device);
        assert!(matches!(norm, NormLayer::BatchNorm(_)));
    }

    #[test]
    fn prediction_head_outputs_probabilities() {
        let device = Default::default();
        let head = PredictionHead::<TestBackend>::new(4, &device);

        let x = Tensor::<TestBackend, 4>::random(
            [1, 4, 4, 4],
            burn::tensor::Distribution::Normal(0.0, 5.0),
            &device,
        );
        let y = head.forward(x);

        assert_eq!(y.dims(), [1, 1, 4, 4]);
        assert!(y.clone().min().into_scalar().to_f64() >= 0.0);
        assert!(y.max().into_scalar().to_f64() <= 1.0);
    }
}
