use crate::hub::{RepositoryId, RepositoryManager};
use core::fmt::Display;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

const LOG_TARGET: &str = "      errors";

/// Thread-safe accumulator of tracking errors, keyed by repository.
///
/// Trackers running concurrently append to the same collector. At the end of a
/// run the orchestrator flushes it, persisting each repository's outcome and
/// producing a [`TrackingReport`].
#[derive(Debug, Default)]
pub struct ErrorsCollector {
    errors: Mutex<BTreeMap<RepositoryId, Vec<String>>>,
}

impl ErrorsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<RepositoryId, Vec<String>>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks a repository as tracked in this run, with no errors so far.
    pub fn init(&self, id: RepositoryId) {
        let _ = self.lock().entry(id).or_default();
    }

    /// Records an error for a repository.
    ///
    /// Safe to call from any number of tasks at once.
    pub fn append(&self, id: RepositoryId, err: impl Display) {
        let msg = without_backtrace(&format!("{err:#}")).to_string();
        log::debug!(target: LOG_TARGET, "Recording error for repository {id}: {msg}");
        self.lock().entry(id).or_default().push(msg);
    }

    /// Number of errors recorded for a repository so far.
    #[must_use]
    pub fn count_for(&self, id: RepositoryId) -> usize {
        self.lock().get(&id).map_or(0, Vec::len)
    }

    /// A copy of everything recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<RepositoryId, Vec<String>> {
        self.lock().clone()
    }

    /// Persists every repository's outcome and returns the run's report.
    ///
    /// Failures to persist an outcome are logged and do not stop the flush.
    pub async fn flush(&self, rm: &dyn RepositoryManager) -> TrackingReport {
        let outcomes = self.snapshot();

        for (id, errors) in &outcomes {
            if let Err(e) = rm.set_last_tracking_results(*id, errors).await {
                log::warn!(target: LOG_TARGET, "Could not record tracking results for repository {id}: {e:#}");
            }
        }

        TrackingReport { outcomes }
    }
}

/// Drops any captured backtrace, keeping the message and its context chain.
fn without_backtrace(text: &str) -> &str {
    text.split("\nBacktrace:").next().unwrap_or(text).trim_end()
}

/// Per-repository outcome of a tracking run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingReport {
    outcomes: BTreeMap<RepositoryId, Vec<String>>,
}

impl TrackingReport {
    /// Number of repositories tracked in the run.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.outcomes.len()
    }

    /// Repositories that reported at least one error, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (RepositoryId, &[String])> {
        self.outcomes
            .iter()
            .filter(|(_, errors)| !errors.is_empty())
            .map(|(id, errors)| (*id, errors.as_slice()))
    }

    #[must_use]
    pub fn errors_for(&self, id: RepositoryId) -> Option<&[String]> {
        self.outcomes.get(&id).map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}
