//! Stale-result guard.
//!
//! When refreshes overlap, a slow older call can finish after a newer one. [`Latest`] hands out
//! tickets from a monotonically increasing counter and only accepts a result if no newer ticket
//! has published yet.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Generation number taken before starting a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct Latest<T> {
    next: AtomicU64,
    published: Mutex<Option<(u64, T)>>,
}

impl<T: Clone> Latest<T> {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
            published: Mutex::new(None),
        }
    }

    /// Starts a new generation.
    pub fn begin(&self) -> Ticket {
        Ticket(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Publishes `value` for `ticket`. Returns `false` and drops `value` if a newer ticket has
    /// already published.
    pub fn publish(&self, ticket: Ticket, value: T) -> bool {
        let mut published = self
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let generation = ticket.generation();
        if matches!(&*published, Some((newest, _)) if *newest > generation) {
            tracing::debug!("discarding stale result from generation {generation}");
            return false;
        }
        *published = Some((generation, value));
        true
    }

    /// The most recently accepted value.
    pub fn current(&self) -> Option<T> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, value)| value.clone())
    }
}
