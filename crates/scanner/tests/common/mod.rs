//! Scripted scan source and payload builders shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use sandwich_lab_scanner::{ScanConfig, ScanError, ScanRequest, ScanResult, ScanSession, ScanSource};
use sandwich_lab_telemetry::Metrics;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Replays canned responses in order and records every request.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<ScanResult<Value>>>,
    requests: Mutex<Vec<(ScanRequest, Instant)>>,
}

impl ScriptedSource {
    pub fn new(responses: Vec<ScanResult<Value>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn befores(&self) -> Vec<Option<u64>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.before)
            .collect()
    }

    /// Start times of every request, relative to the first one.
    pub fn offsets(&self) -> Vec<Duration> {
        let requests = self.requests.lock().unwrap();
        let Some((_, first)) = requests.first() else {
            return Vec::new();
        };
        requests.iter().map(|(_, at)| *at - *first).collect()
    }
}

#[async_trait]
impl ScanSource for ScriptedSource {
    async fn scan(&self, request: &ScanRequest) -> ScanResult<Value> {
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), Instant::now()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ScanError::Transport("script exhausted".to_string())))
    }
}

pub fn config() -> ScanConfig {
    let mut config = ScanConfig::new(
        "http://localhost:8080/sandwiches",
        "Ethereum",
        "0xB4E16D0168E52D35CACD2C6185B44281EC28C9DC",
    );
    config.page_size = 2;
    config
}

pub fn session(source: &Arc<ScriptedSource>, config: ScanConfig) -> Arc<ScanSession> {
    let source: Arc<dyn ScanSource> = source.clone();
    Arc::new(ScanSession::new(config, source, Metrics::new().unwrap()).unwrap())
}

fn swap(block: u64, index: u64, base_in: f64, quote_in: f64, base_out: f64, quote_out: f64) -> Value {
    json!({
        "hash": format!("0x{:056x}{:08x}", block, index),
        "index": index,
        "base_in": base_in,
        "quote_in": quote_in,
        "base_out": base_out,
        "quote_out": quote_out,
        "gas": 120000
    })
}

/// A long sandwich in `block` with one victim.
pub fn sandwich(block: u64) -> Value {
    json!({
        "block_number": block,
        "frontrun": swap(block, 1, 0.0, 10.0, 500.0, 0.0),
        "lunchmeat": [swap(block, 2, 0.0, 50.0, 2400.0, 0.0)],
        "backrun": swap(block, 3, 480.0, 0.0, 0.0, 10.5)
    })
}

pub fn sandwiches(blocks: &[u64]) -> Vec<Value> {
    blocks.iter().copied().map(sandwich).collect()
}

pub fn token_metadata(base: &str) -> Value {
    json!({ "base_symbol": base, "quote_symbol": "USDC", "native_symbol": "ETH" })
}

pub fn completed(lower: u64, upper: u64, sandwiches: Vec<Value>) -> ScanResult<Value> {
    Ok(json!({
        "scan_metadata": { "failed": false, "complete": true, "lower_bound": lower, "upper_bound": upper },
        "sandwiches": sandwiches
    }))
}

pub fn partial(lower: u64, upper: u64, sandwiches: Vec<Value>) -> ScanResult<Value> {
    Ok(json!({
        "scan_metadata": { "failed": false, "complete": false },
        "fetch_metadata": { "lower_bound": lower, "upper_bound": upper },
        "sandwiches": sandwiches
    }))
}

pub fn stalled() -> ScanResult<Value> {
    Ok(json!({
        "scan_metadata": { "failed": false, "complete": false },
        "fetch_metadata": { "lower_bound": null, "upper_bound": null },
        "sandwiches": []
    }))
}

pub fn failed(message: &str) -> ScanResult<Value> {
    Ok(json!({
        "scan_metadata": { "failed": true, "error_message": message, "complete": false }
    }))
}

pub fn with_token_metadata(response: ScanResult<Value>, base: &str) -> ScanResult<Value> {
    response.map(|mut value| {
        value["token_metadata"] = token_metadata(base);
        value
    })
}
