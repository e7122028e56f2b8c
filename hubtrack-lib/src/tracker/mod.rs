//! Tracking orchestration.
//!
//! A run builds one [`Services`] value, asks the tracker factory for one
//! [`Tracker`] per selected repository, and hands them to the
//! [`Orchestrator`], which runs them with bounded concurrency and waits on a
//! [`Countdown`] until every one of them has finished. Errors are gathered in
//! the shared [`ErrorsCollector`] and flushed into a [`TrackingReport`].

mod contract;
mod countdown;
mod errors_collector;
mod factory;
mod orchestrator;
mod pass;
mod progress;
mod services;
mod throttler;
mod verified_publisher;

#[cfg(test)]
pub(crate) mod testing;

pub use contract::{NewTracker, Tracker, TrackerOption, TrackerSettings, bypass_digest_check, with_timeout};
pub use countdown::{Completion, Countdown};
pub use errors_collector::{ErrorsCollector, TrackingReport};
pub use factory::new_tracker;
pub use orchestrator::Orchestrator;
pub use pass::RepositoryTracker;
pub use progress::{NoProgress, Progress, RunProgress};
pub use services::Services;
pub use throttler::Throttler;
pub use verified_publisher::{is_verified_publisher, reconcile_verified_publisher, set_verified_publisher_flag};
