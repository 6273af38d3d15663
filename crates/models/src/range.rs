//! Union of the block intervals scanned during a session.

use serde::{Deserialize, Serialize};

/// Inclusive block interval scanned so far.
///
/// Scanning walks backward from the chain head, so the upper bound is fixed
/// by the first window seen and the lower bound only ever decreases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    lower_bound: Option<u64>,
    upper_bound: Option<u64>,
}

impl Range {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lower_bound(&self) -> Option<u64> {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> Option<u64> {
        self.upper_bound
    }

    /// Merge a reported window `[lower, upper]` into the range.
    pub fn merge(&mut self, lower: u64, upper: u64) {
        if self.upper_bound.is_none() {
            self.upper_bound = Some(upper);
        }
        self.lower_bound = Some(match self.lower_bound {
            Some(current) => current.min(lower),
            None => lower,
        });
    }

    /// Number of blocks covered, or 0 before the first window.
    pub fn total_scanned(&self) -> u64 {
        match (self.lower_bound, self.upper_bound) {
            (Some(lower), Some(upper)) if upper >= lower => upper - lower + 1,
            _ => 0,
        }
    }
}
