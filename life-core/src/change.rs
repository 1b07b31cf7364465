//! The change buffer: a thread-safe, append-only list of cell flips
//! produced by one [`crate::engine::Engine::step`] and applied by one
//! `update`.

use parking_lot::Mutex;

use crate::config::Coord;

/// One cell flip: the cell at `(x, y)` takes on the new value `v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    pub x: Coord,
    pub y: Coord,
    pub v: bool,
}

/// Grows by doubling, starting from 8, matching the source's `realloc`
/// policy. Concurrent appenders observe disjoint slots and each record is
/// recorded exactly once; their relative order is unspecified (§4.2 / §5 —
/// order never matters for correctness since a generation's flips are
/// computed from a snapshot and the set of flips is order-independent).
#[derive(Default)]
pub struct ChangeBuffer {
    items: Mutex<Vec<Change>>,
}

impl ChangeBuffer {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::with_capacity(8)),
        }
    }

    /// Append one record. Safe to call concurrently from any number of
    /// worker threads.
    pub fn append(&self, x: Coord, y: Coord, v: bool) {
        self.items.lock().push(Change { x, y, v });
    }

    /// Clear the buffer without releasing its capacity. Single-writer: the
    /// driver calls this only between generations, never while a step is
    /// in flight.
    pub fn reset(&self) {
        self.items.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the buffer in insertion order. Single-writer: called by the
    /// driver only after the queue has drained.
    pub fn iterate(&self) -> Vec<Change> {
        self.items.lock().clone()
    }
}
