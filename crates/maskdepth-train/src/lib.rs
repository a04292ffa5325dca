pub mod augmentation;
pub mod dataset;
pub mod error;

pub use augmentation::{AugmentationConfig, PairAugmentor};
pub use dataset::{MaskDepthBatcher, MaskDepthDataset, MaskDepthItem, Normalization};
pub use error::{DatasetError, DatasetResult};
