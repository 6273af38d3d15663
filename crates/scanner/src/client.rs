//! HTTP client for the sandwich scan API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ScanError, ScanResult};
use crate::source::{ScanRequest, ScanSource};

/// Scan API client wrapper.
pub struct ScanClient {
    client: Client,
    api_url: String,
}

impl ScanClient {
    /// Create a new scan client.
    ///
    /// # Arguments
    /// * `api_url` - Full URL of the scan endpoint
    /// * `timeout` - Per-request timeout
    pub fn new(api_url: &str, timeout: Duration) -> ScanResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        info!("Initialized scan client for {}", api_url);

        Ok(Self {
            client,
            api_url: api_url.to_string(),
        })
    }
}

#[async_trait]
impl ScanSource for ScanClient {
    async fn scan(&self, request: &ScanRequest) -> ScanResult<Value> {
        debug!(chain = %request.chain, pair = %request.pair, before = ?request.before, "Issuing scan request");

        let response = self
            .client
            .get(&self.api_url)
            .query(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Transport(format!(
                "scan request failed with status: {}",
                status
            )));
        }

        let body = response.text().await?;
        let payload = serde_json::from_str(&body)?;
        Ok(payload)
    }
}
