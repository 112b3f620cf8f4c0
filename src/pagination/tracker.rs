//! Global read position tracking
//!
//! The tracker is the single place window arithmetic happens. Strategies
//! hand it every raw batch in fetch order; it keeps the cumulative count
//! of items seen and cuts out exactly the caller's `[offset,
//! offset+limit)` window, regardless of how the underlying requests
//! happened to chunk the data.

use crate::types::JsonValue;

/// Per-replay window tracker. Created fresh for each `generate_data`
/// call and discarded at the end.
#[derive(Debug)]
pub struct LimitOffsetTracker {
    offset: usize,
    limit: usize,
    global_position: usize,
    remaining_items: usize,
}

impl LimitOffsetTracker {
    /// Create a tracker for the window `[offset, offset + limit)`
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            offset,
            limit,
            global_position: 0,
            remaining_items: limit,
        }
    }

    /// Pre-seed the global position for strategies that can jump to the
    /// window start instead of reading from position zero.
    #[must_use]
    pub fn with_start_position(mut self, position: usize) -> Self {
        self.global_position = position;
        self
    }

    /// Slice one raw batch into the window.
    ///
    /// The global position always advances by the full batch length,
    /// whether or not anything was sliced out of it.
    pub fn slice(&mut self, data: Vec<JsonValue>) -> Vec<JsonValue> {
        let chunk_start = self.offset.saturating_sub(self.global_position);
        let chunk_end = data.len().min(chunk_start + self.remaining_items);
        self.global_position += data.len();

        if chunk_start < data.len() {
            let chunk = data[chunk_start..chunk_end].to_vec();
            self.remaining_items -= chunk.len();
            chunk
        } else {
            Vec::new()
        }
    }

    /// True once the full window has been delivered
    pub fn is_satisfied(&self) -> bool {
        self.remaining_items == 0
    }

    /// Items still owed to the caller
    pub fn remaining(&self) -> usize {
        self.remaining_items
    }

    /// Cumulative count of items seen across all batches
    pub fn global_position(&self) -> usize {
        self.global_position
    }

    /// The window start
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The window length
    pub fn limit(&self) -> usize {
        self.limit
    }
}
