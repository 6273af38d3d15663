//! Page-by-page view over a scan session.

use sandwich_lab_analysis::{ProfitSummary, SandwichAnalysis, SandwichAnalyzer};
use sandwich_lab_models::{Sandwich, TokenMetadata};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::fetch_loop::FetchLoopRun;
use crate::session::{ScanPhase, ScanProgress, ScanSession};

/// A sandwich together with its derived profit figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedSandwich {
    #[serde(flatten)]
    pub sandwich: Sandwich,
    pub analysis: SandwichAnalysis,
}

/// Read-only view of one page, built on demand from the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSnapshot {
    pub page: usize,
    pub sandwiches: Vec<AnnotatedSandwich>,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub token_metadata: Option<TokenMetadata>,
    pub total_blocks_scanned: u64,
    pub failed: bool,
    pub error_message: String,
    /// True while a fetch loop is in flight.
    pub scanning: bool,
    pub state: ScanPhase,
}

impl PageSnapshot {
    /// Totals over the sandwiches on this page.
    pub fn summary(&self) -> ProfitSummary {
        SandwichAnalyzer::summarize(self.sandwiches.iter().map(|entry| &entry.sandwich))
    }
}

/// Paginator over the sandwiches of one scan session.
///
/// Page moves never wait on the network. Moving to a page that is not fully
/// buffered starts the fetch loop in the background until the page, plus one
/// look-ahead sandwich, is available or the scan ends. Progress arrives on
/// [`Paginator::subscribe`]; [`Paginator::settled`] waits for it.
/// Dropping the paginator cancels its session.
pub struct Paginator {
    session: Arc<ScanSession>,
    page: usize,
    page_size: usize,
}

impl Paginator {
    pub fn new(session: Arc<ScanSession>) -> Self {
        let page_size = session.config().page_size;
        Self {
            session,
            page: 0,
            page_size,
        }
    }

    pub fn session(&self) -> &Arc<ScanSession> {
        &self.session
    }

    /// Index of the current page.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Move to page `page` and return its current view.
    ///
    /// The page holds the sandwiches at offset `page * page_size`, which may
    /// be empty while they are still being fetched or past the end of the
    /// scan. A fetch is started in the background if the page is not fully
    /// buffered.
    pub fn get_page(&mut self, page: usize) -> PageSnapshot {
        self.page = page;
        if self.prefetch().is_some() {
            debug!(page, "Fetching in the background for page");
        }
        self.snapshot()
    }

    /// Move one page forward.
    ///
    /// Stays on the current page when the next one holds no data yet; the
    /// look-ahead fetch for the current page then decides whether it exists.
    pub fn advance(&mut self) -> PageSnapshot {
        let next = self.page.saturating_add(1);
        let page = if next <= self.last_page() { next } else { self.page };
        self.get_page(page)
    }

    /// Move one page back, clamped to the last page that holds data.
    pub fn retreat(&mut self) -> PageSnapshot {
        let page = self.page.saturating_sub(1).min(self.last_page());
        self.get_page(page)
    }

    /// Start fetching for the current page in the background.
    ///
    /// Returns `None` when the current page is already backed by data.
    pub fn prefetch(&self) -> Option<JoinHandle<FetchLoopRun>> {
        let target = self.page_end(self.page);
        if !self.needs_fetch(target) {
            return None;
        }
        let session = Arc::clone(&self.session);
        Some(tokio::spawn(async move { session.run_fetch_loop(target).await }))
    }

    /// Receiver notified after every buffer, range or phase change.
    pub fn subscribe(&self) -> watch::Receiver<ScanProgress> {
        self.session.subscribe()
    }

    /// Wait until no fetch loop is running and the current page is backed by
    /// data or the scan has ended.
    ///
    /// Restarts the fetch loop if a loop for a smaller target finished first.
    /// Waits indefinitely while the backend keeps stalling; race it against a
    /// timeout or cancellation when that matters.
    pub async fn settled(&self) -> PageSnapshot {
        let mut updates = self.session.subscribe();
        loop {
            if !self.session.is_running() {
                if !self.needs_fetch(self.page_end(self.page)) {
                    return self.snapshot();
                }
                drop(self.prefetch());
            }
            if updates.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }

    /// Current view without fetching.
    pub fn snapshot(&self) -> PageSnapshot {
        let state = self.session.lock_state();
        let buffered = state.buffer.len();

        let sandwiches = state
            .buffer
            .page(self.page, self.page_size)
            .iter()
            .map(|sandwich| AnnotatedSandwich {
                analysis: SandwichAnalyzer::analyze(sandwich),
                sandwich: sandwich.clone(),
            })
            .collect();

        let (failed, error_message) = match &state.phase {
            ScanPhase::Failed(err) => (true, err.to_string()),
            _ => (false, String::new()),
        };

        PageSnapshot {
            page: self.page,
            sandwiches,
            has_prev_page: self.page > 0,
            has_next_page: self.page_end(self.page) < buffered,
            token_metadata: state.token_metadata.clone(),
            total_blocks_scanned: state.range.total_scanned(),
            failed,
            error_message,
            scanning: self.session.is_running(),
            state: state.phase.clone(),
        }
    }

    /// Offset one past the last sandwich of `page`.
    fn page_end(&self, page: usize) -> usize {
        page.saturating_add(1).saturating_mul(self.page_size)
    }

    fn last_page(&self) -> usize {
        let state = self.session.lock_state();
        if state.buffer.is_empty() {
            return 0;
        }
        state.buffer.page_count(self.page_size) - 1
    }

    fn needs_fetch(&self, target: usize) -> bool {
        let state = self.session.lock_state();
        target >= state.buffer.len() && !state.phase.is_terminal()
    }
}

impl Drop for Paginator {
    fn drop(&mut self) {
        self.session.cancel();
    }
}
