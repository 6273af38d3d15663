//! Append-only store of sandwiches in arrival order.

use sandwich_lab_models::Sandwich;

/// Sandwiches in the order they were received.
///
/// Scanning walks backward, so arrival order is descending block order. No
/// deduplication happens here: windows never overlap.
#[derive(Debug, Clone, Default)]
pub struct SandwichBuffer {
    sandwiches: Vec<Sandwich>,
}

impl SandwichBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sandwiches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sandwiches.is_empty()
    }

    /// Append a decoded batch, keeping response order.
    pub fn extend(&mut self, batch: Vec<Sandwich>) {
        self.sandwiches.extend(batch);
    }

    /// Up to `page_size` sandwiches starting at `page * page_size`.
    pub fn page(&self, page: usize, page_size: usize) -> &[Sandwich] {
        let start = page.saturating_mul(page_size).min(self.sandwiches.len());
        let end = start.saturating_add(page_size).min(self.sandwiches.len());
        &self.sandwiches[start..end]
    }

    /// Number of pages needed to show every buffered sandwich.
    pub fn page_count(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        self.sandwiches.len().div_ceil(page_size)
    }
}
