use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::Notify;

/// Per connection record of what actually reached the transport.
///
/// The transport reports every write and every completed flush.
/// The HTTP/1 connection driver only flushes the transport once its own
/// write buffer is drained, so a flush observed after some point in time
/// guarantees that everything queued before that point was written.
#[derive(Debug, Clone, Default)]
pub struct FlushTracker {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    written: AtomicU64,
    flushes: AtomicU64,
    notify: Notify,
}

impl FlushTracker {
    #[inline(always)]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_write(&self, n: usize) {
        self.inner.written.fetch_add(n as u64, Ordering::AcqRel);
    }

    pub fn record_flush(&self) {
        self.inner.flushes.fetch_add(1, Ordering::AcqRel);
        self.inner.notify.notify_waiters();
    }

    /// Bytes accepted by the transport so far (head and body of all responses).
    #[must_use]
    pub fn written(&self) -> u64 {
        self.inner.written.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn flush_count(&self) -> u64 {
        self.inner.flushes.load(Ordering::Acquire)
    }

    /// Wait for the first transport flush completed after `mark`,
    /// as returned by [`Self::flush_count`].
    pub async fn flushed_since(&self, mark: u64) {
        loop {
            let notified = self.inner.notify.notified();
            let mut notified = std::pin::pin!(notified);
            notified.as_mut().enable();

            if self.flush_count() > mark {
                return;
            }
            notified.await;
        }
    }
}
