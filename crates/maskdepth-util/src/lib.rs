//! Image helpers shared by the dataset and the trainer.
//!
//! - [`ImageUtils`]: tensor/image conversion and channel normalization
//! - [`ImageGrid`]: lay a batch of images out on a grid and save it

mod grid;
mod image;

pub use grid::{GridOptions, ImageGrid};
pub use self::image::{ImageError, ImageResult, ImageUtils};
