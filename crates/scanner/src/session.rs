//! Scan session state owned by one paginator.

use sandwich_lab_models::{Range, TokenMetadata};
use sandwich_lab_telemetry::Metrics;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::buffer::SandwichBuffer;
use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult};
use crate::source::ScanSource;

/// Position of the backward scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    /// Nothing scanned yet; the next request starts at the chain head.
    Head,
    /// Exclusive upper bound for the next request.
    Before(u64),
}

impl Cursor {
    /// Cursor continuing below the lowest block of `range`.
    pub fn from_range(range: &Range) -> Self {
        match range.lower_bound() {
            Some(lower) => Cursor::Before(lower.saturating_sub(1)),
            None => Cursor::Head,
        }
    }

    /// Value of the `before` query parameter.
    pub fn before(&self) -> Option<u64> {
        match self {
            Cursor::Head => None,
            Cursor::Before(block) => Some(*block),
        }
    }

    /// True once the scan has walked back to the start of the chain.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Cursor::Before(0))
    }
}

/// Lifecycle of a scan session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum ScanPhase {
    #[default]
    Idle,
    Scanning,
    /// The last response was an incomplete window with nothing new.
    Stalled,
    Failed(ScanError),
    Exhausted,
    Cancelled,
}

impl ScanPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanPhase::Failed(_) | ScanPhase::Exhausted | ScanPhase::Cancelled
        )
    }
}

/// Session-wide progress, published whenever the fetch loop changes state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    pub buffered: usize,
    pub total_blocks_scanned: u64,
    pub phase: ScanPhase,
    /// True while a fetch loop is in flight.
    pub scanning: bool,
}

pub(crate) struct SessionState {
    pub(crate) buffer: SandwichBuffer,
    pub(crate) range: Range,
    pub(crate) token_metadata: Option<TokenMetadata>,
    pub(crate) cursor: Cursor,
    pub(crate) phase: ScanPhase,
    /// Earliest instant the next request may start.
    pub(crate) next_request_at: Option<Instant>,
    pub(crate) transport_failures: u32,
}

/// One backward scan over a single pair.
///
/// Holds the buffer, range, cursor and token metadata for the session. The
/// state mutex is only held for short synchronous sections, never across a
/// request or a pacing wait.
pub struct ScanSession {
    pub(crate) config: ScanConfig,
    pub(crate) source: Arc<dyn ScanSource>,
    pub(crate) metrics: Metrics,
    pub(crate) sample_output_path: Option<PathBuf>,
    pub(crate) cancel: CancellationToken,
    pub(crate) running: AtomicBool,
    updates: watch::Sender<ScanProgress>,
    state: Mutex<SessionState>,
}

impl ScanSession {
    /// Create a session that starts scanning from the chain head.
    pub fn new(config: ScanConfig, source: Arc<dyn ScanSource>, metrics: Metrics) -> ScanResult<Self> {
        config.validate()?;
        let (updates, _) = watch::channel(ScanProgress::default());

        Ok(Self {
            config,
            source,
            metrics,
            sample_output_path: None,
            cancel: CancellationToken::new(),
            running: AtomicBool::new(false),
            updates,
            state: Mutex::new(SessionState {
                buffer: SandwichBuffer::new(),
                range: Range::new(),
                token_metadata: None,
                cursor: Cursor::Head,
                phase: ScanPhase::Idle,
                next_request_at: None,
                transport_failures: 0,
            }),
        })
    }

    /// Resume below a range scanned by an earlier session.
    pub fn resume_from(self, range: Range) -> Self {
        {
            let mut state = self.lock_state();
            state.range = range;
            state.cursor = Cursor::from_range(&range);
        }
        self.publish_progress();
        self
    }

    /// Append every raw response to `path` as an audit sample.
    pub fn with_sample_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.sample_output_path = Some(path.into());
        self
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receiver that is notified every time [`ScanProgress`] changes.
    pub fn subscribe(&self) -> watch::Receiver<ScanProgress> {
        self.updates.subscribe()
    }

    pub fn progress(&self) -> ScanProgress {
        self.updates.borrow().clone()
    }

    pub(crate) fn publish_progress(&self) {
        let progress = {
            let state = self.lock_state();
            ScanProgress {
                buffered: state.buffer.len(),
                total_blocks_scanned: state.range.total_scanned(),
                phase: state.phase.clone(),
                scanning: self.is_running(),
            }
        };
        self.updates.send_replace(progress);
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn buffered_len(&self) -> usize {
        self.lock_state().buffer.len()
    }

    pub fn range(&self) -> Range {
        self.lock_state().range
    }

    pub fn cursor(&self) -> Cursor {
        self.lock_state().cursor
    }

    pub fn phase(&self) -> ScanPhase {
        self.lock_state().phase.clone()
    }

    pub fn token_metadata(&self) -> Option<TokenMetadata> {
        self.lock_state().token_metadata.clone()
    }

    /// True while a fetch loop is in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Abandon the scan. A pending request or pacing wait returns promptly
    /// and every later fetch loop is a no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
