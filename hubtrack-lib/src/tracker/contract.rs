use super::{Completion, Services};
use crate::Result;
use crate::config::Config;
use crate::hub::Repository;
use async_trait::async_trait;
use core::time::Duration;
use std::sync::Arc;

/// Tracks one repository for one run.
///
/// A tracker is consumed by [`Tracker::track`]. Whatever happens during the
/// pass, the [`Completion`] it was handed is released exactly once before
/// `track` returns, and any error that aborted the pass has already been
/// recorded in the run's errors collector by then.
#[async_trait]
pub trait Tracker: Send {
    fn repository(&self) -> &Repository;

    fn settings(&self) -> &TrackerSettings;

    fn settings_mut(&mut self) -> &mut TrackerSettings;

    async fn track(self: Box<Self>, done: Completion) -> Result<()>;
}

/// Per-tracker knobs, seeded from the run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    pub bypass_digest_check: bool,
    pub timeout: Duration,
}

impl TrackerSettings {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            bypass_digest_check: config.bypass_digest_check,
            timeout: config.repository_timeout,
        }
    }
}

/// Adjusts a tracker after construction.
pub type TrackerOption = Box<dyn FnOnce(&mut dyn Tracker) + Send>;

/// Process the repository even when its remote digest has not changed.
#[must_use]
pub fn bypass_digest_check() -> TrackerOption {
    Box::new(|tracker| tracker.settings_mut().bypass_digest_check = true)
}

/// Bound the tracker's pass by `timeout` instead of the configured default.
#[must_use]
pub fn with_timeout(timeout: Duration) -> TrackerOption {
    Box::new(move |tracker| tracker.settings_mut().timeout = timeout)
}

/// Builds a tracker for a repository.
///
/// Must not perform any I/O; all work happens in [`Tracker::track`].
pub type NewTracker = fn(Arc<Services>, Repository, Vec<TrackerOption>) -> Box<dyn Tracker>;
