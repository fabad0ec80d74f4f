//! Error Handling Module
//!
//! Defines the error type shared by every stage of the growth-stage pipeline.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for growth-stage training operations
#[derive(Error, Debug)]
pub enum GrowthStageError {
    /// Dataset root (or another required path) does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Dataset root exists but holds no recognizable images
    #[error("No images found under '{0}'")]
    EmptyDataset(PathBuf),

    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error building or restoring the model
    #[error("Model error: {0}")]
    Model(String),

    /// Error during the training loop
    #[error("Training error: {0}")]
    Training(String),

    /// Error writing or pruning a checkpoint
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for GrowthStageError {
    fn from(err: serde_json::Error) -> Self {
        GrowthStageError::Serialization(err.to_string())
    }
}

/// Convenience Result type for growth-stage operations
pub type Result<T> = std::result::Result<T, GrowthStageError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| GrowthStageError::Dataset(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| GrowthStageError::Dataset(format!("{}: {}", f(), e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| GrowthStageError::Dataset(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| GrowthStageError::Dataset(f()))
    }
}
