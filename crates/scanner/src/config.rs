//! Scan session configuration.

use std::time::Duration;

use crate::error::{ScanError, ScanResult};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_MIN_CYCLE: Duration = Duration::from_millis(2000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_TRANSPORT_RETRIES: u32 = 3;
/// Longest accepted `min_cycle`.
pub const MAX_MIN_CYCLE: Duration = Duration::from_secs(3600);

/// Settings for one scan session.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Full URL of the scan endpoint, e.g. `https://host/api/sandwiches`.
    pub api_url: String,
    /// Chain identifier, e.g. `ethereum`.
    pub chain: String,
    /// Pair contract address.
    pub pair: String,
    pub page_size: usize,
    /// Minimum time between the starts of two consecutive requests.
    pub min_cycle: Duration,
    pub request_timeout: Duration,
    /// Consecutive transport failures tolerated before the session fails.
    pub max_transport_retries: u32,
}

impl ScanConfig {
    /// Create a config with default pacing and paging.
    pub fn new(api_url: &str, chain: &str, pair: &str) -> Self {
        Self {
            api_url: api_url.to_string(),
            chain: chain.to_string(),
            pair: pair.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            min_cycle: DEFAULT_MIN_CYCLE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_transport_retries: DEFAULT_MAX_TRANSPORT_RETRIES,
        }
    }

    pub fn validate(&self) -> ScanResult<()> {
        if self.api_url.trim().is_empty() {
            return Err(ScanError::Config("api url is empty".to_string()));
        }
        if self.chain.trim().is_empty() {
            return Err(ScanError::Config("chain identifier is empty".to_string()));
        }
        if self.pair.trim().is_empty() {
            return Err(ScanError::Config("pair address is empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(ScanError::Config("page size must be positive".to_string()));
        }
        if self.min_cycle > MAX_MIN_CYCLE {
            return Err(ScanError::Config(format!(
                "min cycle must be at most {}s",
                MAX_MIN_CYCLE.as_secs()
            )));
        }
        Ok(())
    }
}
