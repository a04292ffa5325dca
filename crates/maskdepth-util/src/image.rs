//! Tensor/host conversion and channel normalization.

use std::path::PathBuf;

use burn::tensor::{backend::Backend, DType, Tensor, TensorData};
use thiserror::Error;

/// ImageError covers the failures of converting tensors to images and saving them.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to save image to '{path}': {source}")]
    ImageSaveError {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to convert tensor to data: {reason}")]
    TensorConversionError { reason: String },

    #[error("failed to create image buffer: {reason}")]
    BufferCreationError { reason: String },

    #[error("unsupported channel count: {channels} (supported: 1, 3)")]
    UnsupportedChannelCount { channels: usize },

    #[error("expected {expected} normalization values per statistic, got mean={mean} std={std}")]
    NormalizationLengthMismatch {
        expected: usize,
        mean: usize,
        std: usize,
    },

    #[error("standard deviation must be non-zero, got {std:?}")]
    ZeroStandardDeviation { std: Vec<f32> },

    #[error("cannot build an image from an empty batch")]
    EmptyBatch,
}

/// Result type alias for ImageError
pub type ImageResult<T> = Result<T, ImageError>;

/// Tensor and image conversion helpers.
pub struct ImageUtils;

impl ImageUtils {
    /// Copy a tensor to host memory as `f32` values in row-major order.
    pub fn tensor_to_host<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> ImageResult<Vec<f32>> {
        tensor
            .into_data()
            .convert_dtype(DType::F32)
            .to_vec::<f32>()
            .map_err(|e| ImageError::TensorConversionError {
                reason: format!("{e:?}"),
            })
    }

    /// Build a `[1, channels, height, width]` tensor from HWC `f32` pixels.
    pub fn hwc_to_tensor<B: Backend>(
        pixels: Vec<f32>,
        height: usize,
        width: usize,
        channels: usize,
        device: &B::Device,
    ) -> Tensor<B, 4> {
        Tensor::<B, 3>::from_data(TensorData::new(pixels, [height, width, channels]), device)
            .permute([2, 0, 1])
            .unsqueeze::<4>()
    }

    /// Apply `(x - mean) / std` per channel.
    ///
    /// # Arguments
    /// * `tensor` - Tensor of shape [batch, channels, height, width]
    /// * `mean` - One value per channel
    /// * `std` - One non-zero value per channel
    pub fn normalize_channels<B: Backend>(
        tensor: Tensor<B, 4>,
        mean: &[f32],
        std: &[f32],
    ) -> ImageResult<Tensor<B, 4>> {
        let [_, channels, _, _] = tensor.dims();
        if mean.len() != channels || std.len() != channels {
            return Err(ImageError::NormalizationLengthMismatch {
                expected: channels,
                mean: mean.len(),
                std: std.len(),
            });
        }
        if std.iter().any(|s| *s == 0.0) {
            return Err(ImageError::ZeroStandardDeviation { std: std.to_vec() });
        }

        let device = tensor.device();
        let mean = Tensor::<B, 1>::from_floats(mean, &device).reshape([1, channels, 1, 1]);
        let std = Tensor::<B, 1>::from_floats(std, &device).reshape([1, channels, 1, 1]);

        Ok((tensor - mean) / std)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::TestBackend;

    #[test]
    fn tensor_to_host_keeps_row_major_order() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0], [3.0, 4.0]], &device);

        let host = ImageUtils::tensor_to_host(tensor).unwrap();

        assert_eq!(host, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn hwc_to_tensor_moves_channels_first() {
        let device = Default::default();
        // 1x2 image, RGB
        let pixels = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];

        let tensor = ImageUtils::hwc_to_tensor::<TestBackend>(pixels, 1, 2, 3, &device);

        assert_eq!(tensor.dims(), [1, 3, 1, 2]);
        let host = ImageUtils::tensor_to_host(tensor).unwrap();
        assert_eq!(host, vec![0.1, 0.4, 0.2, 0.5, 0.3, 0.6]);
    }

    #[test]
    fn normalize_channels_applies_per_channel_statistics() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::ones([1, 2, 1, 1], &device);

        let normalized = ImageUtils::normalize_channels(tensor, &[0.5, 0.0], &[0.5, 2.0]).unwrap();

        let host = ImageUtils::tensor_to_host(normalized).unwrap();
        assert_eq!(host, vec![1.0, 0.5]);
    }

    #[test]
    fn normalize_channels_rejects_bad_statistics() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::ones([1, 3, 2, 2], &device);

        let length = ImageUtils::normalize_channels(tensor.clone(), &[0.5], &[0.5, 0.5, 0.5]);
        let zero = ImageUtils::normalize_channels(tensor, &[0.5; 3], &[0.5, 0.0, 0.5]);

        assert!(matches!(
            length,
            Err(ImageError::NormalizationLengthMismatch { expected: 3, mean: 1, std: 3 })
        ));
        assert!(matches!(zero, Err(ImageError::ZeroStandardDeviation { .. })));
    }
}
