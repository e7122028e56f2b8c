use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Limits how many trackers run at once.
///
/// Call [`Throttler::acquire`] before launching each tracker and hold the
/// returned permit for as long as the tracker runs. At most `max_concurrent`
/// permits are outstanding at any time.
#[derive(Debug, Clone)]
pub struct Throttler {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Throttler {
    /// Creates a throttler; a limit of zero is treated as one.
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Waits for a free slot, giving up once `cancel` fires.
    ///
    /// Returns `None` when cancelled; the caller must not start the work.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok(),
        }
    }
}
