//! Error types for the sync layer.

use crate::auth::AuthError;
use crate::tutor::{InferenceError, TemplateError};
use thiserror::Error;

/// Main error type for sync-layer operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("record shape error: {0}")]
    Shape(String),

    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

/// Result type for sync-layer operations.
pub type Result<T> = std::result::Result<T, SyncError>;
