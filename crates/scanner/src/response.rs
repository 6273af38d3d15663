//! Decoding of scan API payloads into [`ScanOutcome`].
//!
//! The payload carries its window under `fetch_metadata` while a window is
//! still being produced and under `scan_metadata` once it is complete. All of
//! that is resolved here, once, so the fetch loop only sees the variant.

use sandwich_lab_models::{Sandwich, TokenMetadata};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{ScanError, ScanResult};

#[derive(Debug, Deserialize)]
struct RawScanResponse {
    scan_metadata: Option<RawScanMetadata>,
    fetch_metadata: Option<RawBounds>,
    token_metadata: Option<TokenMetadata>,
    sandwiches: Option<Vec<Sandwich>>,
}

#[derive(Debug, Deserialize)]
struct RawScanMetadata {
    #[serde(default)]
    failed: bool,
    error_message: Option<String>,
    #[serde(default)]
    complete: bool,
    lower_bound: Option<u64>,
    upper_bound: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawBounds {
    lower_bound: Option<u64>,
    upper_bound: Option<u64>,
}

/// Inclusive block interval covered by one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub lower: u64,
    pub upper: u64,
}

impl Window {
    fn from_bounds(lower: Option<u64>, upper: Option<u64>, source: &str) -> ScanResult<Self> {
        match (lower, upper) {
            (Some(lower), Some(upper)) if lower <= upper => Ok(Self { lower, upper }),
            (Some(lower), Some(upper)) => Err(ScanError::MalformedResponse(format!(
                "{} window is inverted: {} > {}",
                source, lower, upper
            ))),
            _ => Err(ScanError::MalformedResponse(format!(
                "{} is missing its block bounds",
                source
            ))),
        }
    }
}

/// One decoded scan response.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// The backend gave up on this scan.
    Failed { message: String },
    /// The window is still being produced and holds nothing new yet.
    Stalled {
        token_metadata: Option<TokenMetadata>,
    },
    /// Part of a window, with sandwiches found so far.
    PartialWindow {
        window: Window,
        sandwiches: Vec<Sandwich>,
        token_metadata: Option<TokenMetadata>,
    },
    /// A finished window.
    CompletedWindow {
        window: Window,
        sandwiches: Vec<Sandwich>,
        token_metadata: Option<TokenMetadata>,
    },
}

impl ScanOutcome {
    /// Decode and validate a raw payload.
    ///
    /// Every sandwich is validated before anything is returned, so a single
    /// bad entry rejects the whole response.
    pub fn decode(payload: Value) -> ScanResult<Self> {
        let raw: RawScanResponse = serde_json::from_value(payload)?;
        let scan = raw.scan_metadata.ok_or_else(|| {
            ScanError::MalformedResponse("response is missing scan_metadata".to_string())
        })?;

        if scan.failed {
            return Ok(ScanOutcome::Failed {
                message: scan
                    .error_message
                    .unwrap_or_else(|| "scan failed without an error message".to_string()),
            });
        }

        let sandwiches = raw.sandwiches.unwrap_or_default();
        for sandwich in &sandwiches {
            sandwich.validate()?;
            for swap in sandwich.swaps().filter(|swap| !swap.has_canonical_hash()) {
                warn!(
                    block_number = sandwich.block_number,
                    hash = %swap.hash,
                    "Non-canonical transaction hash"
                );
            }
        }
        let token_metadata = raw.token_metadata;

        if scan.complete {
            let window = Window::from_bounds(scan.lower_bound, scan.upper_bound, "scan_metadata")?;
            return Ok(ScanOutcome::CompletedWindow {
                window,
                sandwiches,
                token_metadata,
            });
        }

        let fetch = raw.fetch_metadata.ok_or_else(|| {
            ScanError::MalformedResponse(
                "incomplete scan response is missing fetch_metadata".to_string(),
            )
        })?;

        if sandwiches.is_empty() {
            return Ok(ScanOutcome::Stalled { token_metadata });
        }

        let window = Window::from_bounds(fetch.lower_bound, fetch.upper_bound, "fetch_metadata")?;
        Ok(ScanOutcome::PartialWindow {
            window,
            sandwiches,
            token_metadata,
        })
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanOutcome::Failed { .. } => "failed",
            ScanOutcome::Stalled { .. } => "stalled",
            ScanOutcome::PartialWindow { .. } => "partial",
            ScanOutcome::CompletedWindow { .. } => "completed",
        }
    }
}
