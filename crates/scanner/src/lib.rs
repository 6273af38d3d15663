//! Incremental client for the MEV sandwich scan API.
//!
//! A [`ScanSession`] walks the chain backward one window at a time, pacing its
//! requests, and a [`Paginator`] exposes the buffered sandwiches page by page,
//! pulling more windows only when a page needs them.

pub mod buffer;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch_loop;
pub mod paginator;
pub mod response;
pub mod session;
pub mod source;

pub use buffer::SandwichBuffer;
pub use client::ScanClient;
pub use config::ScanConfig;
pub use error::{ScanError, ScanResult};
pub use fetch_loop::{FetchLoopRun, LoopExit};
pub use paginator::{AnnotatedSandwich, PageSnapshot, Paginator};
pub use response::{ScanOutcome, Window};
pub use session::{Cursor, ScanPhase, ScanProgress, ScanSession};
pub use source::{ScanRequest, ScanSource};
