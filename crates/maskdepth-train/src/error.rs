//! Error types of dataset loading.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for dataset operations.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// A required sub-directory of the dataset root is missing.
    #[error("{kind} directory not found: {path}")]
    DirectoryNotFound {
        /// Which directory (`fgbg`, `mask` or `depth`).
        kind: &'static str,
        /// The expected directory path.
        path: PathBuf,
    },

    /// Error when walking a directory fails.
    #[error("Failed to read directory: {path}")]
    DirectoryReadFailed {
        /// The directory being walked.
        path: PathBuf,
        /// The underlying walk error.
        #[source]
        source: walkdir::Error,
    },

    /// No fgbg image has both a mask and a depth map.
    #[error("No complete fgbg/mask/depth triplets found in: {path}")]
    NoValidTriplets {
        /// The dataset root.
        path: PathBuf,
    },

    /// Error when opening or decoding an image file fails.
    #[error("Failed to open image: {path}")]
    ImageOpenFailed {
        /// The image file path that failed to open.
        path: PathBuf,
        /// The underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// A path component is not valid UTF-8.
    #[error("Path contains invalid UTF-8: {path}")]
    InvalidUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// Normalization statistics cannot be applied.
    #[error("Invalid normalization: {reason}")]
    InvalidNormalization {
        /// What is wrong with the statistics.
        reason: String,
    },

    /// Requested image size has a zero side.
    #[error("Image size must be non-zero, got {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },
}

/// A specialized `Result` type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;
