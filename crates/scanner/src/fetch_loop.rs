//! The backward scan loop.
//!
//! Each iteration issues one request at the current cursor, classifies the
//! response and folds it into the session. Requests are paced so that two
//! consecutive requests never start less than `min_cycle` apart, including
//! across separate invocations of the loop.

use sandwich_lab_models::TokenMetadata;
use sandwich_lab_telemetry::audit;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::error::{ScanError, ScanResult};
use crate::response::ScanOutcome;
use crate::session::{Cursor, ScanPhase, ScanSession, SessionState};
use crate::source::ScanRequest;

/// Result of asking the session to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchLoopRun {
    /// Another loop is in flight; nothing was done.
    AlreadyRunning,
    Finished(LoopExit),
}

/// Why a fetch loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The buffer holds more sandwiches than the requested target.
    TargetReached,
    /// The scan reached the start of the chain.
    Exhausted,
    Failed(ScanError),
    Cancelled,
}

struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ScanSession {
    /// Scan backward until more than `target` sandwiches are buffered, the
    /// chain start is reached, the scan fails, or the session is cancelled.
    ///
    /// Progress is published to [`ScanSession::subscribe`] when the loop
    /// starts, after every response and when it stops.
    ///
    /// A call made while another loop is in flight is rejected with
    /// [`FetchLoopRun::AlreadyRunning`] and leaves the session untouched.
    /// Once the session is failed, exhausted or cancelled every call returns
    /// that exit without issuing a request.
    pub async fn run_fetch_loop(&self, target: usize) -> FetchLoopRun {
        let exit = {
            let Some(_guard) = RunGuard::acquire(&self.running) else {
                debug!("Fetch loop already running, ignoring request");
                return FetchLoopRun::AlreadyRunning;
            };
            self.publish_progress();
            self.fetch_until(target).await
        };

        self.publish_progress();
        FetchLoopRun::Finished(exit)
    }

    async fn fetch_until(&self, target: usize) -> LoopExit {
        loop {
            let (request, not_before) = match self.next_request(target) {
                Ok(next) => next,
                Err(exit) => return exit,
            };

            if !self.pace(not_before).await {
                return self.mark_cancelled();
            }

            let started = Instant::now();
            self.metrics.inc_scan_requests();
            let response = tokio::select! {
                _ = self.cancel.cancelled() => return self.mark_cancelled(),
                response = self.source.scan(&request) => response,
            };

            let outcome = response.and_then(|payload| {
                if let Err(e) = audit::write_audit_sample(
                    self.sample_output_path.as_ref(),
                    &request,
                    &payload,
                ) {
                    warn!("Failed to write audit sample: {}", e);
                }
                ScanOutcome::decode(payload)
            });

            let exit = self.apply(&request, started, outcome);
            self.publish_progress();
            if let Some(exit) = exit {
                return exit;
            }
        }
    }

    /// Check the stopping conditions and build the next request.
    fn next_request(&self, target: usize) -> Result<(ScanRequest, Option<Instant>), LoopExit> {
        let mut state = self.lock_state();

        match &state.phase {
            ScanPhase::Failed(err) => return Err(LoopExit::Failed(err.clone())),
            ScanPhase::Exhausted => return Err(LoopExit::Exhausted),
            ScanPhase::Cancelled => return Err(LoopExit::Cancelled),
            _ => {}
        }
        if self.cancel.is_cancelled() {
            state.phase = ScanPhase::Cancelled;
            return Err(LoopExit::Cancelled);
        }
        if state.cursor.is_exhausted() {
            info!(
                blocks_scanned = state.range.total_scanned(),
                sandwiches = state.buffer.len(),
                "Scan reached the start of the chain"
            );
            state.phase = ScanPhase::Exhausted;
            return Err(LoopExit::Exhausted);
        }
        if state.buffer.len() > target {
            state.phase = ScanPhase::Idle;
            return Err(LoopExit::TargetReached);
        }

        if state.phase != ScanPhase::Stalled {
            state.phase = ScanPhase::Scanning;
        }
        let request = ScanRequest::new(&self.config.chain, &self.config.pair, state.cursor.before());
        Ok((request, state.next_request_at))
    }

    /// Wait until `not_before`. Returns false if cancelled while waiting.
    async fn pace(&self, not_before: Option<Instant>) -> bool {
        let Some(deadline) = not_before else {
            return true;
        };
        let now = Instant::now();
        if now >= deadline {
            return true;
        }

        self.metrics.inc_pacing_waits();
        debug!(wait_ms = (deadline - now).as_millis() as u64, "Pacing scan requests");
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = sleep_until(deadline) => true,
        }
    }

    /// Fold one response into the session. Returns an exit if the loop must stop.
    fn apply(
        &self,
        request: &ScanRequest,
        started: Instant,
        outcome: ScanResult<ScanOutcome>,
    ) -> Option<LoopExit> {
        let latency = started.elapsed().as_secs_f64();
        let mut state = self.lock_state();
        state.next_request_at = Some(started + self.config.min_cycle);

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(ScanError::Transport(message)) => {
                self.metrics.observe_request_latency("transport_error", latency);
                return self.transport_failure(&mut state, started, message);
            }
            Err(err) => {
                self.metrics.observe_request_latency("malformed", latency);
                return Some(self.fail(&mut state, err));
            }
        };

        self.metrics.observe_request_latency(outcome.kind(), latency);
        state.transport_failures = 0;
        if matches!(outcome, ScanOutcome::CompletedWindow { .. }) {
            self.metrics.inc_completed_windows();
        }

        match outcome {
            ScanOutcome::Failed { message } => {
                Some(self.fail(&mut state, ScanError::ScanFailed(message)))
            }
            ScanOutcome::Stalled { token_metadata } => {
                merge_token_metadata(&mut state, token_metadata);
                state.phase = ScanPhase::Stalled;
                self.metrics.inc_stalled_windows();
                warn!(before = ?request.before, "Scan window stalled, retrying at the same cursor");
                None
            }
            ScanOutcome::PartialWindow {
                window,
                sandwiches,
                token_metadata,
            }
            | ScanOutcome::CompletedWindow {
                window,
                sandwiches,
                token_metadata,
            } => {
                merge_token_metadata(&mut state, token_metadata);
                let found = sandwiches.len();
                state.buffer.extend(sandwiches);
                state.range.merge(window.lower, window.upper);
                let cursor = Cursor::from_range(&state.range);
                state.cursor = cursor;
                state.phase = ScanPhase::Scanning;

                self.metrics.inc_sandwiches_buffered(found as u64);
                info!(
                    lower = window.lower,
                    upper = window.upper,
                    found,
                    buffered = state.buffer.len(),
                    blocks_scanned = state.range.total_scanned(),
                    "Scanned window"
                );
                None
            }
        }
    }

    fn transport_failure(
        &self,
        state: &mut SessionState,
        started: Instant,
        message: String,
    ) -> Option<LoopExit> {
        self.metrics.inc_transport_errors();
        state.transport_failures += 1;

        if state.transport_failures > self.config.max_transport_retries {
            return Some(self.fail(state, ScanError::Transport(message)));
        }

        let backoff = self
            .config
            .min_cycle
            .saturating_mul(1u32 << state.transport_failures.min(16));
        state.next_request_at = Some(
            started
                .checked_add(backoff)
                .unwrap_or(started + self.config.min_cycle),
        );
        warn!(
            attempt = state.transport_failures,
            backoff_ms = backoff.as_millis() as u64,
            "Scan request failed: {}",
            message
        );
        None
    }

    fn fail(&self, state: &mut SessionState, err: ScanError) -> LoopExit {
        error!("Scan failed: {}", err);
        self.metrics.inc_scan_failures();
        state.phase = ScanPhase::Failed(err.clone());
        LoopExit::Failed(err)
    }

    fn mark_cancelled(&self) -> LoopExit {
        info!("Scan cancelled");
        self.lock_state().phase = ScanPhase::Cancelled;
        LoopExit::Cancelled
    }
}

/// Token metadata is taken from the first response that carries it.
fn merge_token_metadata(state: &mut SessionState, token_metadata: Option<TokenMetadata>) {
    if state.token_metadata.is_none() {
        state.token_metadata = token_metadata;
    }
}
