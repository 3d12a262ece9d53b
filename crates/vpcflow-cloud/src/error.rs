//! Cloud provider error types

use thiserror::Error;

/// Errors raised by the provider-neutral layer
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Unknown schema field: {0}")]
    UnknownField(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
