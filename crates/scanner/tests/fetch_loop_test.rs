//! Fetch loop behaviour against scripted scan responses.

mod common;

use common::*;
use sandwich_lab_models::Range;
use sandwich_lab_scanner::{
    Cursor, FetchLoopRun, LoopExit, Paginator, ScanError, ScanPhase, ScanSession,
};
use sandwich_lab_telemetry::Metrics;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[tokio::test(start_paused = true)]
async fn test_walks_back_until_chain_start() {
    let source = ScriptedSource::new(vec![
        completed(51, 100, sandwiches(&[99, 80])),
        completed(1, 50, sandwiches(&[40])),
    ]);
    let session = session(&source, config());

    let run = session.run_fetch_loop(usize::MAX).await;

    assert_eq!(run, FetchLoopRun::Finished(LoopExit::Exhausted));
    assert_eq!(source.befores(), vec![None, Some(50)]);
    assert_eq!(session.cursor(), Cursor::Before(0));
    assert_eq!(session.range().total_scanned(), 100);
    assert_eq!(session.range().upper_bound(), Some(100));
    assert_eq!(session.buffered_len(), 3);
    assert_eq!(session.phase(), ScanPhase::Exhausted);

    // No extra request once the chain start is reached.
    let again = session.run_fetch_loop(usize::MAX).await;
    assert_eq!(again, FetchLoopRun::Finished(LoopExit::Exhausted));
    assert_eq!(source.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_requests_are_paced() {
    let source = ScriptedSource::new(vec![
        completed(91, 100, sandwiches(&[95])),
        stalled(),
        stalled(),
        partial(85, 90, sandwiches(&[88])),
        completed(1, 84, vec![]),
    ]);
    let session = session(&source, config());

    let run = session.run_fetch_loop(usize::MAX).await;

    assert_eq!(run, FetchLoopRun::Finished(LoopExit::Exhausted));
    assert_eq!(
        source.befores(),
        vec![None, Some(90), Some(90), Some(90), Some(84)]
    );
    let offsets: Vec<u64> = source.offsets().iter().map(|d| d.as_millis() as u64).collect();
    assert_eq!(offsets, vec![0, 2000, 4000, 6000, 8000]);
    assert_eq!(session.metrics().pacing_waits(), 4);
    assert_eq!(session.metrics().stalled_windows(), 2);
    assert_eq!(session.buffered_len(), 2);
    assert_eq!(session.range().total_scanned(), 100);
}

#[tokio::test(start_paused = true)]
async fn test_stall_keeps_cursor_and_buffer() {
    let source = ScriptedSource::new(vec![
        completed(91, 100, sandwiches(&[99, 93])),
        stalled(),
        stalled(),
        stalled(),
    ]);
    let session = session(&source, config());

    let handle = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.run_fetch_loop(usize::MAX).await }
    });

    // First request at 0s, the stalled retry at 2s.
    sleep(Duration::from_millis(2100)).await;
    assert_eq!(source.request_count(), 2);
    assert_eq!(session.phase(), ScanPhase::Stalled);
    assert_eq!(session.cursor(), Cursor::Before(90));
    assert_eq!(session.buffered_len(), 2);
    assert_eq!(session.range().total_scanned(), 10);
    // One wait before the retry, one more now pending after the stall.
    assert_eq!(session.metrics().pacing_waits(), 2);

    session.cancel();
    assert_eq!(
        handle.await.unwrap(),
        FetchLoopRun::Finished(LoopExit::Cancelled)
    );
    assert_eq!(source.befores(), vec![None, Some(90)]);
}

#[tokio::test(start_paused = true)]
async fn test_second_loop_is_rejected_while_running() {
    let source = ScriptedSource::new(vec![stalled(), completed(1, 10, sandwiches(&[5]))]);
    let session = session(&source, config());

    let handle = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.run_fetch_loop(usize::MAX).await }
    });

    sleep(Duration::from_millis(100)).await;
    assert!(session.is_running());
    assert_eq!(session.run_fetch_loop(usize::MAX).await, FetchLoopRun::AlreadyRunning);
    assert_eq!(source.request_count(), 1);

    assert_eq!(
        handle.await.unwrap(),
        FetchLoopRun::Finished(LoopExit::Exhausted)
    );
    assert!(!session.is_running());
    assert_eq!(source.request_count(), 2);
    assert_eq!(session.buffered_len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_scan_is_terminal() {
    let source = ScriptedSource::new(vec![
        completed(91, 100, sandwiches(&[95])),
        failed("archive node unavailable"),
        completed(1, 90, sandwiches(&[50])),
    ]);
    let session = session(&source, config());

    let expected = LoopExit::Failed(ScanError::ScanFailed("archive node unavailable".to_string()));
    assert_eq!(
        session.run_fetch_loop(usize::MAX).await,
        FetchLoopRun::Finished(expected.clone())
    );
    assert_eq!(source.request_count(), 2);

    // Re-entry never un-fails the session.
    assert_eq!(
        session.run_fetch_loop(usize::MAX).await,
        FetchLoopRun::Finished(expected)
    );
    assert_eq!(source.request_count(), 2);
    assert_eq!(session.buffered_len(), 1);

    let paginator = Paginator::new(Arc::clone(&session));
    let snapshot = paginator.snapshot();
    assert!(snapshot.failed);
    assert_eq!(snapshot.error_message, "archive node unavailable");
    assert_eq!(snapshot.sandwiches.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_response_leaves_state_untouched() {
    let source = ScriptedSource::new(vec![
        completed(91, 100, sandwiches(&[95])),
        Ok(json!({
            "scan_metadata": { "failed": false, "complete": false },
            "sandwiches": sandwiches(&[89])
        })),
    ]);
    let session = session(&source, config());

    let run = session.run_fetch_loop(usize::MAX).await;

    assert!(matches!(
        run,
        FetchLoopRun::Finished(LoopExit::Failed(ScanError::MalformedResponse(_)))
    ));
    assert_eq!(session.buffered_len(), 1);
    assert_eq!(session.range().total_scanned(), 10);
    assert_eq!(session.cursor(), Cursor::Before(90));
    assert!(session.phase().is_terminal());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_sandwich_rejects_whole_window() {
    let mut bad = sandwich(98);
    bad["backrun"]["index"] = json!(0);
    let source = ScriptedSource::new(vec![partial(80, 100, vec![sandwich(99), bad])]);
    let session = session(&source, config());

    let run = session.run_fetch_loop(usize::MAX).await;

    assert!(matches!(
        run,
        FetchLoopRun::Finished(LoopExit::Failed(ScanError::MalformedResponse(_)))
    ));
    assert_eq!(session.buffered_len(), 0);
    assert_eq!(session.range(), Range::new());
    assert_eq!(session.cursor(), Cursor::Head);
}

#[tokio::test(start_paused = true)]
async fn test_short_hash_is_still_buffered() {
    let mut short = sandwich(98);
    short["frontrun"]["hash"] = json!("0xabc123");
    let source = ScriptedSource::new(vec![completed(1, 100, vec![sandwich(99), short])]);
    let session = session(&source, config());

    let run = session.run_fetch_loop(usize::MAX).await;

    assert_eq!(run, FetchLoopRun::Finished(LoopExit::Exhausted));
    assert_eq!(session.buffered_len(), 2);
    assert_eq!(session.range().total_scanned(), 100);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_retries_with_backoff() {
    let source = ScriptedSource::new(vec![
        Err(ScanError::Transport("connection reset by peer".to_string())),
        completed(1, 100, sandwiches(&[50])),
    ]);
    let session = session(&source, config());

    let run = session.run_fetch_loop(usize::MAX).await;

    assert_eq!(run, FetchLoopRun::Finished(LoopExit::Exhausted));
    assert_eq!(source.befores(), vec![None, None]);
    assert_eq!(source.offsets(), vec![Duration::ZERO, Duration::from_secs(4)]);
    assert_eq!(session.metrics().transport_errors(), 1);
    assert_eq!(session.buffered_len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transport_errors_exhaust_retries() {
    let mut config = config();
    config.max_transport_retries = 1;
    let source = ScriptedSource::new(vec![
        Err(ScanError::Transport("connection refused".to_string())),
        Err(ScanError::Transport("connection refused".to_string())),
        completed(1, 100, sandwiches(&[50])),
    ]);
    let session = session(&source, config);

    let run = session.run_fetch_loop(usize::MAX).await;

    assert_eq!(
        run,
        FetchLoopRun::Finished(LoopExit::Failed(ScanError::Transport(
            "connection refused".to_string()
        )))
    );
    assert_eq!(source.request_count(), 2);

    let paginator = Paginator::new(Arc::clone(&session));
    let snapshot = paginator.snapshot();
    assert!(snapshot.failed);
    assert_eq!(snapshot.error_message, "transport error: connection refused");
}

#[tokio::test(start_paused = true)]
async fn test_token_metadata_is_set_once() {
    let source = ScriptedSource::new(vec![
        completed(91, 100, vec![]),
        with_token_metadata(stalled(), "WETH"),
        with_token_metadata(completed(1, 90, vec![]), "WBTC"),
    ]);
    let session = session(&source, config());

    session.run_fetch_loop(usize::MAX).await;

    let token_metadata = session.token_metadata().unwrap();
    assert_eq!(token_metadata.base_symbol, "WETH");
    assert_eq!(token_metadata.quote_symbol, "USDC");
    assert_eq!(token_metadata.native_symbol, "ETH");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_pacing_wait() {
    let source = ScriptedSource::new(vec![stalled(), stalled()]);
    let session = session(&source, config());
    let started = Instant::now();

    let handle = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.run_fetch_loop(usize::MAX).await }
    });

    sleep(Duration::from_millis(500)).await;
    session.cancel();

    assert_eq!(
        handle.await.unwrap(),
        FetchLoopRun::Finished(LoopExit::Cancelled)
    );
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(source.request_count(), 1);
    assert_eq!(session.phase(), ScanPhase::Cancelled);

    assert_eq!(
        session.run_fetch_loop(usize::MAX).await,
        FetchLoopRun::Finished(LoopExit::Cancelled)
    );
    assert_eq!(source.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resume_below_earlier_range() {
    let source = ScriptedSource::new(vec![completed(1, 499, sandwiches(&[300]))]);
    let mut range = Range::new();
    range.merge(500, 900);
    let session = ScanSession::new(config(), source.clone(), Metrics::new().unwrap())
        .unwrap()
        .resume_from(range);

    let run = session.run_fetch_loop(usize::MAX).await;

    assert_eq!(run, FetchLoopRun::Finished(LoopExit::Exhausted));
    assert_eq!(source.befores(), vec![Some(499)]);
    assert_eq!(session.range().upper_bound(), Some(900));
    assert_eq!(session.range().total_scanned(), 900);
}
