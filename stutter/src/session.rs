use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

/// Process wide step counters, keyed by session id.
///
/// Implementations must make [`SessionRegistry::claim_step`]
/// a single atomic read-then-increment.
pub trait SessionRegistry: Send + Sync + 'static {
    /// Advance the counter of `session_id` by one and return its
    /// value *before* the increment, starting at `0` for unseen ids.
    fn claim_step(&self, session_id: &str) -> u64;
}

impl<R: SessionRegistry> SessionRegistry for Arc<R> {
    #[inline(always)]
    fn claim_step(&self, session_id: &str) -> u64 {
        (**self).claim_step(session_id)
    }
}

/// In-memory [`SessionRegistry`] guarded by one exclusive lock.
///
/// Entries live as long as the registry, there is no eviction.
#[derive(Debug, Default)]
pub struct MemorySessionRegistry {
    counters: Mutex<HashMap<String, u64>>,
}

impl MemorySessionRegistry {
    #[inline(always)]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct sessions seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.lock().is_empty()
    }
}

impl SessionRegistry for MemorySessionRegistry {
    fn claim_step(&self, session_id: &str) -> u64 {
        let mut counters = self.counters.lock();
        match counters.get_mut(session_id) {
            Some(counter) => {
                let step = *counter;
                *counter = step.saturating_add(1);
                step
            }
            None => {
                counters.insert(session_id.to_owned(), 1);
                0
            }
        }
    }
}
