//! Request id generation for subscribe/unsubscribe frames.
//!
//! Ids are derived from the wall clock in nanoseconds and forced strictly
//! increasing, so two requests never share an id even within one tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Generates locally-unique, strictly increasing request ids.
#[derive(Debug, Default)]
pub struct RequestIds {
    last: AtomicU64,
}

impl RequestIds {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_time_nanos() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64
    }

    /// Next raw id value.
    pub fn next_value(&self) -> u64 {
        let now = Self::current_time_nanos();

        loop {
            let last = self.last.load(Ordering::SeqCst);
            let next = now.max(last + 1);

            if self
                .last
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return next;
            }
        }
    }

    /// Next id rendered as `<prefix>_<value>`, e.g. `sub_1700000000000000000`.
    pub fn next_id(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.next_value())
    }
}
