use thiserror::Error;

/// The error type for model construction and input validation.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Error for when the model configuration is logically inconsistent.
    #[error("Invalid model configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Error for when an input tensor has a shape the model cannot process.
    #[error("Invalid input tensor shape: expected {expected}, got {actual}")]
    InvalidInputShape {
        /// The expected tensor shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },
}

/// A specialized `Result` type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
