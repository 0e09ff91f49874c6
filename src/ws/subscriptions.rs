//! Active topic tracking.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::HotcoinError;

/// The set of topics with a subscribe in flight or acknowledged.
///
/// Guarded by its own lock, independent of the connection state lock.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    active: Mutex<HashSet<String>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `topic` active. Fails if it already is.
    pub fn insert(&self, topic: &str) -> Result<(), HotcoinError> {
        if self.lock().insert(topic.to_string()) {
            Ok(())
        } else {
            Err(HotcoinError::AlreadySubscribed(topic.to_string()))
        }
    }

    /// Drop `topic`. Returns whether it was active; absent topics are fine.
    pub fn remove(&self, topic: &str) -> bool {
        self.lock().remove(topic)
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.lock().contains(topic)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sorted copy of the active topics.
    pub fn snapshot(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.lock().iter().cloned().collect();
        topics.sort();
        topics
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
