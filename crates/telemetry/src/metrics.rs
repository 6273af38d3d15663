//! Prometheus metrics for scan sessions.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, Opts, Registry, TextEncoder,
};

/// Metrics collector for one scan session.
///
/// Each instance owns its registry so several sessions can run in one process.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    scan_requests: IntCounter,
    stalled_windows: IntCounter,
    completed_windows: IntCounter,
    sandwiches_buffered: IntCounter,
    transport_errors: IntCounter,
    scan_failures: IntCounter,
    pacing_waits: IntCounter,
    request_latency: HistogramVec,
}

fn counter(registry: &Registry, name: &str, help: &str) -> anyhow::Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl Metrics {
    /// Create a new metrics instance with its own registry.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let scan_requests = counter(
            &registry,
            "sandwich_lab_scan_requests_total",
            "Total number of scan requests issued",
        )?;
        let stalled_windows = counter(
            &registry,
            "sandwich_lab_stalled_windows_total",
            "Incomplete scan responses without new sandwiches",
        )?;
        let completed_windows = counter(
            &registry,
            "sandwich_lab_completed_windows_total",
            "Scan windows reported complete by the backend",
        )?;
        let sandwiches_buffered = counter(
            &registry,
            "sandwich_lab_sandwiches_buffered_total",
            "Sandwiches appended to the session buffer",
        )?;
        let transport_errors = counter(
            &registry,
            "sandwich_lab_transport_errors_total",
            "Scan requests that failed before a response was decoded",
        )?;
        let scan_failures = counter(
            &registry,
            "sandwich_lab_scan_failures_total",
            "Sessions that ended in the failed state",
        )?;
        let pacing_waits = counter(
            &registry,
            "sandwich_lab_pacing_waits_total",
            "Waits inserted to hold the minimum request cycle",
        )?;

        let request_latency = HistogramVec::new(
            HistogramOpts::new(
                "sandwich_lab_scan_latency_seconds",
                "Scan request latency in seconds",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(request_latency.clone()))?;

        Ok(Self {
            registry,
            scan_requests,
            stalled_windows,
            completed_windows,
            sandwiches_buffered,
            transport_errors,
            scan_failures,
            pacing_waits,
            request_latency,
        })
    }

    pub fn inc_scan_requests(&self) {
        self.scan_requests.inc();
    }

    pub fn inc_stalled_windows(&self) {
        self.stalled_windows.inc();
    }

    pub fn inc_completed_windows(&self) {
        self.completed_windows.inc();
    }

    pub fn inc_sandwiches_buffered(&self, count: u64) {
        self.sandwiches_buffered.inc_by(count);
    }

    pub fn inc_transport_errors(&self) {
        self.transport_errors.inc();
    }

    pub fn inc_scan_failures(&self) {
        self.scan_failures.inc();
    }

    pub fn inc_pacing_waits(&self) {
        self.pacing_waits.inc();
    }

    /// Record scan request latency.
    pub fn observe_request_latency(&self, outcome: &str, duration_secs: f64) {
        self.request_latency
            .with_label_values(&[outcome])
            .observe(duration_secs);
    }

    pub fn scan_requests(&self) -> u64 {
        self.scan_requests.get()
    }

    pub fn stalled_windows(&self) -> u64 {
        self.stalled_windows.get()
    }

    pub fn pacing_waits(&self) -> u64 {
        self.pacing_waits.get()
    }

    pub fn transport_errors(&self) -> u64 {
        self.transport_errors.get()
    }

    /// Get Prometheus metrics in the text exposition format.
    pub fn gather(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
