//! Audit samples of raw scan responses.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Serialize)]
struct AuditRecord<'a, R: Serialize, T: Serialize> {
    recorded_at: DateTime<Utc>,
    request: &'a R,
    response: &'a T,
}

/// Append a request/response pair to the audit file as pretty JSON.
///
/// # Arguments
/// * `path` - Path to the audit file, `None` disables auditing
/// * `request` - The request that produced the payload
/// * `response` - Raw payload returned by the backend
pub fn write_audit_sample<P: AsRef<Path>, R: Serialize, T: Serialize>(
    path: Option<P>,
    request: &R,
    response: &T,
) -> anyhow::Result<()> {
    if let Some(audit_path) = path {
        let record = AuditRecord {
            recorded_at: Utc::now(),
            request,
            response,
        };
        let json = serde_json::to_string_pretty(&record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&audit_path)?;
        writeln!(file, "{}", json)?;
        debug!("Wrote audit sample to {:?}", audit_path.as_ref());
    }
    Ok(())
}
