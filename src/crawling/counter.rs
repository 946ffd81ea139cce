use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Run-wide count of successful downloads.
///
/// Clones share the same value. `increment` returns the post-increment value, so each
/// successful download observes a distinct sequence number in completion order.
#[derive(Debug, Clone, Default)]
pub struct SharedCounter {
    value: Arc<AtomicU64>,
}

impl SharedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }
}
