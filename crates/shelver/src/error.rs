//! Error types for the shelver pipeline

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Shelver error type
#[derive(Error, Debug)]
pub enum ShelverError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Extraction failed for {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Destination already has a file named {0}")]
    DestinationCollision(PathBuf),

    #[error("Move failed for {path}: {reason}")]
    MoveFailed { path: PathBuf, reason: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ShelverError>;
