//! Error taxonomy for scan sessions.

use sandwich_lab_models::ModelError;
use serde::Serialize;

/// Errors that end a scan iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ScanError {
    /// The backend reported `failed: true`; the message is its own, verbatim.
    #[error("{0}")]
    ScanFailed(String),
    /// The request could not be completed (connection, timeout, non-2xx).
    #[error("transport error: {0}")]
    Transport(String),
    /// The payload did not match the scan protocol.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        ScanError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::MalformedResponse(err.to_string())
    }
}

impl From<ModelError> for ScanError {
    fn from(err: ModelError) -> Self {
        ScanError::MalformedResponse(err.to_string())
    }
}
