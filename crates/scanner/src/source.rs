//! Interface to the backend scan endpoint.
//!
//! The session only depends on [`ScanSource`], so the HTTP client can be
//! swapped for another transport or a scripted source.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::ScanResult;

/// Parameters of one scan request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    pub chain: String,
    pub pair: String,
    /// Exclusive upper block bound; `None` scans from the chain head.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<u64>,
}

impl ScanRequest {
    /// Create a request, normalizing chain and pair to lowercase.
    pub fn new(chain: &str, pair: &str, before: Option<u64>) -> Self {
        Self {
            chain: chain.trim().to_lowercase(),
            pair: pair.trim().to_lowercase(),
            before,
        }
    }
}

/// Source of raw scan responses.
#[async_trait]
pub trait ScanSource: Send + Sync {
    /// Issue one scan request and return the undecoded JSON payload.
    ///
    /// # Errors
    /// `ScanError::Transport` when the request could not be completed,
    /// `ScanError::MalformedResponse` when the body is not JSON.
    async fn scan(&self, request: &ScanRequest) -> ScanResult<Value>;
}
