use std::path::PathBuf;

use maskdepth_model::ModelError;
use maskdepth_train::DatasetError;
use maskdepth_util::ImageError;
use thiserror::Error;

/// Errors of the training loop and its bookkeeping.
#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("invalid training configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("failed to access '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize '{path}'")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to save model record: {reason}")]
    Record { reason: String },

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Image(#[from] ImageError),
}

impl TrainerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias of the trainer.
pub type TrainerResult<T> = Result<T, TrainerError>;
