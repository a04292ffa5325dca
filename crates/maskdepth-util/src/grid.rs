//! Batch-to-grid image layout.
//!
//! Images of a `[N, C, H, W]` batch are tiled row by row, `nrow` images per
//! row, separated and surrounded by `padding` pixels of `pad_value`.
//! A batch of one image is returned unpadded. Single-channel batches are
//! replicated to RGB.

use std::path::Path;

use burn::{
    config::Config,
    tensor::{backend::Backend, Tensor},
};
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};

use crate::image::{ImageError, ImageResult, ImageUtils};

/// Layout of an [`ImageGrid`].
#[derive(Config, Debug)]
pub struct GridOptions {
    /// Images per row. Default: 8
    #[config(default = 8)]
    pub nrow: usize,

    /// Pixels between and around images. Default: 2
    #[config(default = 2)]
    pub padding: usize,

    /// Min-max rescale the whole batch to `[0, 1]`.
    #[config(default = false)]
    pub normalize: bool,

    /// Intensity of the padding, in `[0, 1]`.
    #[config(default = 0.0)]
    pub pad_value: f32,
}

/// Builds and saves image grids.
pub struct ImageGrid;

impl ImageGrid {
    /// Lay out a batch of images on a grid.
    ///
    /// # Arguments
    /// * `tensor` - Tensor of shape [batch, channels, height, width] with 1 or 3 channels
    /// * `options` - Grid layout
    ///
    /// Values outside `[0, 1]` after optional normalization are clamped.
    pub fn make_grid<B: Backend>(tensor: Tensor<B, 4>, options: &GridOptions) -> ImageResult<RgbImage> {
        let [batch, channels, height, width] = tensor.dims();
        if batch == 0 {
            return Err(ImageError::EmptyBatch);
        }
        if !matches!(channels, 1 | 3) {
            return Err(ImageError::UnsupportedChannelCount { channels });
        }

        let mut values = ImageUtils::tensor_to_host(tensor)?;
        if options.normalize {
            normalize_min_max(&mut values);
        }

        let columns = options.nrow.clamp(1, batch);
        let rows = batch.div_ceil(columns);
        let padding = if batch == 1 { 0 } else { options.padding };
        let cell_height = height + padding;
        let cell_width = width + padding;
        let grid_height = rows * cell_height + padding;
        let grid_width = columns * cell_width + padding;

        let pad = to_byte(options.pad_value);
        let mut grid: RgbImage = ImageBuffer::from_pixel(
            u32::try_from(grid_width).map_err(|_| too_large(grid_width, grid_height))?,
            u32::try_from(grid_height).map_err(|_| too_large(grid_width, grid_height))?,
            Rgb([pad, pad, pad]),
        );

        let plane = height * width;
        for index in 0..batch {
            let top = (index / columns) * cell_height + padding;
            let left = (index % columns) * cell_width + padding;
            let image = &values[index * channels * plane..(index + 1) * channels * plane];

            for y in 0..height {
                for x in 0..width {
                    let offset = y * width + x;
                    let pixel = if channels == 1 {
                        let v = to_byte(image[offset]);
                        [v, v, v]
                    } else {
                        [
                            to_byte(image[offset]),
                            to_byte(image[plane + offset]),
                            to_byte(image[2 * plane + offset]),
                        ]
                    };
                    grid.put_pixel((left + x) as u32, (top + y) as u32, Rgb(pixel));
                }
            }
        }

        Ok(grid)
    }

    /// Build a grid and write it to `path`; the format follows the extension.
    pub fn save<B: Backend, P: AsRef<Path>>(
        tensor: Tensor<B, 4>,
        path: P,
        options: &GridOptions,
    ) -> ImageResult<()> {
        let grid = Self::make_grid(tensor, options)?;
        DynamicImage::ImageRgb8(grid)
            .save(path.as_ref())
            .map_err(|source| ImageError::ImageSaveError {
                path: path.as_ref().to_path_buf(),
                source,
            })
    }
}

fn normalize_min_max(values: &mut [f32]) {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let scale = (max - min).max(1e-5);
    for v in values.iter_mut() {
        *v = (*v - min) / scale;
    }
}

fn to_byte(value: f32) -> u8 {
    (value * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}

fn too_large(width: usize, height: usize) -> ImageError {
    ImageError::BufferCreationError {
        reason: format!("grid of {width}x{height} pixels exceeds the image size limit"),
    }
}

#[cfg(test)]
mod tests {
    use burn::tensor::TensorData;

    use super::*;
    use crate::tests::TestBackend;

    #[test]
    fn grid_layout_matches_rows_and_padding() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::ones([5, 1, 4, 6], &device);
        let options = GridOptions::new().with_nrow(2);

        let grid = ImageGrid::make_grid(tensor, &options).unwrap();

        // 2 columns, 3 rows
        assert_eq!(grid.width(), 2 * (6 + 2) + 2);
        assert_eq!(grid.height(), 3 * (4 + 2) + 2);
        assert_eq!(grid.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(grid.get_pixel(2, 2), &Rgb([255, 255, 255]));
        // empty slot of the sixth image
        assert_eq!(grid.get_pixel(10, 14), &Rgb([0, 0, 0]));
    }

    #[test]
    fn single_image_grid_has_no_padding() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::ones([1, 1, 4, 5], &device);

        let grid = ImageGrid::make_grid(tensor, &GridOptions::new()).unwrap();

        assert_eq!(grid.dimensions(), (5, 4));
        assert_eq!(grid.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn grid_keeps_rgb_channels_apart() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::from_data(
            TensorData::from([[[[1.0]], [[0.0]], [[0.5]]]]),
            &device,
        );

        let grid = ImageGrid::make_grid(tensor, &GridOptions::new().with_padding(0)).unwrap();

        assert_eq!(grid.dimensions(), (1, 1));
        assert_eq!(grid.get_pixel(0, 0), &Rgb([255, 0, 128]));
    }

    #[test]
    fn grid_normalize_rescales_to_full_range() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::from_data(
            TensorData::from([[[[-2.0, 0.0, 2.0]]]]),
            &device,
        );
        let options = GridOptions::new().with_padding(0).with_normalize(true);

        let grid = ImageGrid::make_grid(tensor, &options).unwrap();

        assert_eq!(grid.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(grid.get_pixel(1, 0), &Rgb([128, 128, 128]));
        assert_eq!(grid.get_pixel(2, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn grid_rejects_unsupported_channels() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::zeros([1, 2, 4, 4], &device);

        let result = ImageGrid::make_grid(tensor, &GridOptions::new());

        assert!(matches!(
            result,
            Err(ImageError::UnsupportedChannelCount { channels: 2 })
        ));
    }

    #[test]
    fn save_writes_png_and_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::zeros([3, 3, 8, 8], &device);

        for name in ["grid.png", "grid.jpg"] {
            let path = dir.path().join(name);
            ImageGrid::save(tensor.clone(), &path, &GridOptions::new()).unwrap();
            let written = image::open(&path).unwrap();
            assert_eq!(written.width(), 3 * 10 + 2);
        }
    }

    #[test]
    fn save_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::zeros([1, 1, 4, 4], &device);

        let result = ImageGrid::save(tensor, dir.path().join("missing/grid.png"), &GridOptions::new());

        assert!(matches!(result, Err(ImageError::ImageSaveError { .. })));
    }
}
