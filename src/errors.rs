// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the frame monitor

use std::fmt;
use std::path::PathBuf;

use crate::backends::camera::BackendError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Frame source errors
    Backend(BackendError),
    /// Configuration errors
    Config(ConfigError),
    /// Display sink errors
    Sink(SinkError),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Near clip must be strictly smaller than far clip
    InvalidDepthRange { near: f32, far: f32 },
    /// Config file could not be read
    Read { path: PathBuf, message: String },
    /// Config file could not be parsed
    Parse { path: PathBuf, message: String },
    /// Config could not be serialized
    Serialize(String),
}

/// Display sink errors
#[derive(Debug, Clone)]
pub enum SinkError {
    /// Output could not be written
    WriteFailed { path: PathBuf, message: String },
    /// Sink is closed and no longer accepts textures
    Closed,
}

/// Result type for display sink operations
pub type SinkResult<T> = Result<T, SinkError>;

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Backend(e) => write!(f, "Frame source error: {}", e),
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Sink(e) => write!(f, "Display error: {}", e),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidDepthRange { near, far } => {
                write!(f, "near clip ({}) must be finite and below far clip ({})", near, far)
            }
            ConfigError::Read { path, message } => {
                write!(f, "failed to read {}: {}", path.display(), message)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "failed to parse {}: {}", path.display(), message)
            }
            ConfigError::Serialize(msg) => write!(f, "failed to serialize config: {}", msg),
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::WriteFailed { path, message } => {
                write!(f, "failed to write {}: {}", path.display(), message)
            }
            SinkError::Closed => write!(f, "display sink is closed"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for SinkError {}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<SinkError> for AppError {
    fn from(err: SinkError) -> Self {
        AppError::Sink(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}
