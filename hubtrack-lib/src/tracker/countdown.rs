//! Completion counting for concurrently running trackers.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    pending: AtomicUsize,
    zero: Notify,
}

/// Counts outstanding units of work and lets one party wait for all of them.
///
/// Every call to [`Countdown::completion`] registers one unit of work and hands
/// back a [`Completion`] guard. The unit is finished when the guard is dropped
/// or explicitly signaled, which happens on every exit path including panics,
/// so [`Countdown::wait`] can never hang on a tracker that bailed out early.
#[derive(Debug, Clone, Default)]
pub struct Countdown {
    inner: Arc<Inner>,
}

impl Countdown {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one unit of outstanding work.
    #[must_use = "dropping the guard immediately completes the work it stands for"]
    pub fn completion(&self) -> Completion {
        let _ = self.inner.pending.fetch_add(1, Ordering::AcqRel);
        Completion {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of units still outstanding.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Waits until no work is outstanding.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.zero.notified();
            tokio::pin!(notified);

            // Register interest before checking so a concurrent drop to zero is not missed.
            let _ = notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }

            notified.await;
        }
    }
}

/// Proof that one unit of work is still running.
///
/// Finishing it more than once is impossible: the guard is consumed by
/// [`Completion::done`] and its drop is the only other way to finish it.
#[derive(Debug)]
pub struct Completion {
    inner: Arc<Inner>,
}

impl Completion {
    /// Signals that the work this guard stands for has finished.
    pub fn done(self) {
        drop(self);
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.inner.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.zero.notify_waiters();
        }
    }
}
