use super::{Countdown, NewTracker, NoProgress, Progress, RunProgress, Services, Throttler, TrackingReport};
use crate::Result;
use crate::hub::{Repository, RepositoryId};
use ohno::EnrichableExt;
use std::sync::Arc;
use tokio::task::JoinHandle;

const LOG_TARGET: &str = "orchestrator";

/// Runs one tracker per repository with bounded concurrency.
///
/// The orchestrator registers every launched tracker with a [`Countdown`] and
/// waits for it to reach zero before flushing the errors collector, so the
/// report always reflects every tracker's outcome.
pub struct Orchestrator {
    svc: Arc<Services>,
    new_tracker: NewTracker,
    throttler: Throttler,
    progress: Arc<dyn Progress>,
}

impl core::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("svc", &self.svc)
            .field("throttler", &self.throttler)
            .field("progress", &"<dyn Progress>")
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator using the configured concurrency.
    #[must_use]
    pub fn new(svc: Arc<Services>, new_tracker: NewTracker) -> Self {
        let throttler = Throttler::new(svc.config().concurrency);
        Self {
            svc,
            new_tracker,
            throttler,
            progress: Arc::new(NoProgress),
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.throttler = Throttler::new(max_concurrent);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    /// Lists the repositories the configuration selects for tracking.
    pub async fn select_repositories(&self) -> Result<Vec<Repository>> {
        let all = self
            .svc
            .repository_manager()
            .list()
            .await
            .map_err(|e| e.enrich("listing repositories"))?;

        let total = all.len();
        let selected: Vec<_> = all.into_iter().filter(|r| self.svc.config().selects(r)).collect();
        log::info!(target: LOG_TARGET, "Selected {} of {total} repositories for tracking", selected.len());

        Ok(selected)
    }

    /// Selects and tracks repositories, returning the run's report.
    pub async fn track_all(&self) -> Result<TrackingReport> {
        let repositories = self.select_repositories().await?;
        Ok(self.run(repositories).await)
    }

    /// Tracks the given repositories and returns once every tracker has finished.
    pub async fn run(&self, repositories: Vec<Repository>) -> TrackingReport {
        let errors = self.svc.errors();
        let cancel = self.svc.cancellation();
        let run_progress = RunProgress::new(&self.progress, repositories.len());
        let countdown = Countdown::new();

        log::info!(
            target: LOG_TARGET,
            "Tracking {} repositories, at most {} at a time",
            repositories.len(),
            self.throttler.max_concurrent()
        );

        // Held until every tracker is launched so the count cannot reach zero early.
        let launching = countdown.completion();
        let mut handles: Vec<(RepositoryId, JoinHandle<()>)> = Vec::with_capacity(repositories.len());

        for repository in repositories {
            let id = repository.id;
            errors.init(id);

            let Some(permit) = self.throttler.acquire(cancel).await else {
                errors.append(id, format!("tracking of repository '{}' was cancelled before it started", repository.name));
                run_progress.complete(false);
                continue;
            };

            let done = countdown.completion();
            let tracker = (self.new_tracker)(Arc::clone(&self.svc), repository, Vec::new());
            let run_progress = run_progress.clone();

            handles.push((
                id,
                tokio::spawn(async move {
                    let _permit = permit;
                    let outcome = tracker.track(done).await;
                    run_progress.complete(outcome.is_ok());
                }),
            ));
        }

        launching.done();
        countdown.wait().await;

        for (id, handle) in handles {
            if let Err(e) = handle.await {
                log::error!(target: LOG_TARGET, "Tracker for repository {id} did not finish cleanly: {e}");
                run_progress.println(&format!("Tracker for repository {id} did not finish cleanly"));
                errors.append(id, format!("tracker did not finish cleanly: {e}"));
                run_progress.complete(false);
            }
        }

        run_progress.done();
        errors.flush(self.svc.repository_manager()).await
    }
}
