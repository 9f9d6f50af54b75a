//! Shared work queue of resource names.
//!
//! The queue is fully pre-populated before any worker starts and never
//! refilled, so an observed-empty queue is terminally empty and a worker may
//! exit. Blank entries are discarded at population time; they are never real
//! work.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// How often a waiting worker re-checks the queue within its poll window
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Thread-safe FIFO of resource names, consumed to exhaustion by the worker
/// pool. Ownership of an item transfers to whichever worker dequeues it; no
/// item is ever returned twice.
pub struct WorkQueue {
    items: Mutex<VecDeque<String>>,
}

impl WorkQueue {
    /// Build a queue from `names`, dropping blank entries.
    ///
    /// Returns the queue and the number of blank entries that were skipped.
    pub fn from_names(names: impl IntoIterator<Item = String>) -> (Self, usize) {
        let mut items = VecDeque::new();
        let mut skipped_blank = 0usize;
        for name in names {
            if name.trim().is_empty() {
                skipped_blank += 1;
            } else {
                items.push_back(name);
            }
        }
        (
            Self {
                items: Mutex::new(items),
            },
            skipped_blank,
        )
    }

    /// Take the next item, waiting up to `wait` for one to be observable.
    ///
    /// Returns `None` once the queue has stayed empty for the whole window.
    /// Since nothing produces work after startup, `None` means drained.
    pub async fn dequeue(&self, wait: Duration) -> Option<String> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(item) = self.items.lock().await.pop_front() {
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Number of items currently queued
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// True when no items remain
    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}
