//! Progress reporting for tracking runs.

use core::sync::atomic::{AtomicU64, Ordering};
use owo_colors::OwoColorize;
use std::sync::Arc;

/// A trait for reporting progress of long-running operations.
pub trait Progress: Send + Sync {
    /// Set the phase label for the current operation (e.g., "Tracking").
    fn set_phase(&self, phase: &str);

    /// Configure determinate progress reporting.
    ///
    /// The callback should return (total, current, message).
    fn set_determinate(&self, callback: Box<dyn Fn() -> (u64, u64, String) + Send + Sync + 'static>);

    /// Print a message line without disrupting the progress indicator.
    fn println(&self, msg: &str);

    /// Finish and clear the progress indicator.
    fn done(&self);

    /// Whether messages may carry ANSI colors.
    fn use_colors(&self) -> bool {
        false
    }
}

/// Progress sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn set_phase(&self, _phase: &str) {}
    fn set_determinate(&self, _callback: Box<dyn Fn() -> (u64, u64, String) + Send + Sync + 'static>) {}
    fn println(&self, _msg: &str) {}
    fn done(&self) {}
}

#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Counts repositories as they finish and feeds the progress indicator.
#[derive(Clone)]
pub struct RunProgress {
    counters: Arc<Counters>,
    progress: Arc<dyn Progress>,
}

impl core::fmt::Debug for RunProgress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RunProgress")
            .field("counters", &self.counters)
            .field("progress", &"<dyn Progress>")
            .finish()
    }
}

impl RunProgress {
    #[must_use]
    pub fn new(progress: &Arc<dyn Progress>, total: usize) -> Self {
        let counters = Arc::new(Counters::default());
        counters.total.store(u64::try_from(total).unwrap_or(u64::MAX), Ordering::Relaxed);

        let counters_clone = Arc::clone(&counters);
        let use_colors = progress.use_colors();
        progress.set_phase("Tracking");
        progress.set_determinate(Box::new(move || Self::callback(&counters_clone, use_colors)));

        Self {
            counters,
            progress: Arc::clone(progress),
        }
    }

    /// Records a finished repository.
    pub fn complete(&self, succeeded: bool) {
        let counter = if succeeded { &self.counters.succeeded } else { &self.counters.failed };
        let _ = counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn println(&self, msg: &str) {
        self.progress.println(msg);
    }

    pub fn done(&self) {
        self.progress.done();
    }

    fn callback(counters: &Counters, use_colors: bool) -> (u64, u64, String) {
        let total = counters.total.load(Ordering::Relaxed);
        let succeeded = counters.succeeded.load(Ordering::Relaxed);
        let failed = counters.failed.load(Ordering::Relaxed);
        let finished = succeeded + failed;

        let mut message = format!("{finished}/{total} repositories");
        if failed > 0 {
            let failures = format!("{failed} failed");
            if use_colors {
                message = format!("{message}, {}", failures.red());
            } else {
                message = format!("{message}, {failures}");
            }
        }

        (total, finished, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProgress {
        callback: Mutex<Option<Box<dyn Fn() -> (u64, u64, String) + Send + Sync + 'static>>>,
        lines: Mutex<Vec<String>>,
    }

    impl Progress for RecordingProgress {
        fn set_phase(&self, _phase: &str) {}
        fn set_determinate(&self, callback: Box<dyn Fn() -> (u64, u64, String) + Send + Sync + 'static>) {
            *self.callback.lock().unwrap() = Some(callback);
        }
        fn println(&self, msg: &str) {
            self.lines.lock().unwrap().push(msg.to_string());
        }
        fn done(&self) {}
    }

    #[test]
    fn counts_finished_repositories() {
        let recording = Arc::new(RecordingProgress::default());
        let run = RunProgress::new(&(Arc::clone(&recording) as Arc<dyn Progress>), 3);

        run.complete(true);
        run.complete(false);

        let state = (recording.callback.lock().unwrap().as_ref().unwrap())();
        assert_eq!(state, (3, 2, "2/3 repositories, 1 failed".to_string()));
    }

    #[test]
    fn failures_are_red_when_colors_are_enabled() {
        let counters = Counters::default();
        counters.total.store(1, Ordering::Relaxed);
        counters.failed.store(1, Ordering::Relaxed);

        let (_, _, message) = RunProgress::callback(&counters, true);
        assert!(message.contains("\x1b[31m"));
    }

    #[test]
    fn println_delegates_to_progress() {
        let recording = Arc::new(RecordingProgress::default());
        let run = RunProgress::new(&(Arc::clone(&recording) as Arc<dyn Progress>), 0);
        run.println("hello");
        assert_eq!(*recording.lines.lock().unwrap(), vec!["hello".to_string()]);
    }
}
