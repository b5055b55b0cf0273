use std::path::PathBuf;

use compact_str::{CompactString, ToCompactString};
use thiserror::Error;

use crate::{client::ClientError, storage::StorageError};

pub type Result<T> = std::result::Result<T, StarsError>;

#[derive(Debug, Error)]
pub enum StarsError {
    #[error("Failed to load configuration from: {path}")]
    ConfigLoadError { path: PathBuf, message: String },

    #[error("Failed to save configuration to: {path}")]
    ConfigSaveError { path: PathBuf, message: String },

    #[error("Invalid configuration: {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("unknown route: {0}")]
    UnknownRoute(CompactString),

    #[error("invalid request: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    GeneralError(CompactString),
}

impl StarsError {
    /// Create a configuration load error
    pub fn config_load_error(path: PathBuf, source: impl std::fmt::Display) -> Self {
        Self::ConfigLoadError { path, message: source.to_string() }
    }

    /// Create a configuration save error
    pub fn config_save_error(path: PathBuf, source: impl std::fmt::Display) -> Self {
        Self::ConfigSaveError { path, message: source.to_string() }
    }

    /// Create a configuration validation error
    pub fn config_validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidationError { field: field.into(), message: message.into() }
    }

    pub fn general(message: impl std::fmt::Display) -> Self {
        Self::GeneralError(message.to_compact_string())
    }
}
