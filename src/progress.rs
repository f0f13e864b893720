//! Progress reporting infrastructure

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::{
    borrow::Cow,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// CLI progress report of ongoing operations
///
/// To avoid corrupted terminal output, you should not write anything to stdout
/// or stderr yourself as long as a report is being displayed. Please use logs
/// for debug messages.
#[derive(Clone, Debug, Default)]
pub struct ProgressReport(MultiProgress);
//
impl ProgressReport {
    /// Prepare to report progress on the cli
    pub fn new() -> Self {
        Self::default()
    }

    /// Track progress without displaying anything
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self(MultiProgress::with_draw_target(
            indicatif::ProgressDrawTarget::hidden(),
        ))
    }

    /// Prepare to report on a new operation
    pub fn add(
        &self,
        what: impl Into<Cow<'static, str>>,
        config: ProgressConfig,
    ) -> ProgressTracker {
        let ProgressConfig {
            initial_work,
            can_add_work,
        } = config;
        let bar = ProgressBar::new(initial_work)
            .with_prefix(what)
            .with_style(
                ProgressStyle::with_template("{prefix} {wide_bar} {pos}/{len} ({per_sec})")
                    .expect("this style should be a valid indicatif style"),
            );
        let added = initial_work > 0;
        if added {
            self.0.add(bar.clone());
        }
        ProgressTracker {
            bar,
            report: self.0.clone(),
            added: Arc::new(AtomicBool::new(added)),
            upcoming: Arc::new(AtomicBool::new(can_add_work)),
            cleared: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Progress bar configuration
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ProgressConfig {
    /// Initial number of steps
    initial_work: u64,

    /// Can add more steps after initial configuration
    can_add_work: bool,
}
//
impl ProgressConfig {
    /// Default configuration, with some initial amount of work
    pub fn new(initial_work: u64) -> Self {
        Self {
            initial_work,
            can_add_work: false,
        }
    }

    /// Enable addition of work after initial configuration
    pub fn allow_adding_work(self) -> Self {
        Self {
            can_add_work: true,
            ..self
        }
    }
}

/// Mechanism to track progress
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    /// Progress bar for this specific process
    bar: ProgressBar,

    /// Underlying process report
    report: MultiProgress,

    /// Truth that the progress bar has already been added to the report
    added: Arc<AtomicBool>,

    /// Truth that more work can still be added to this progress bar
    upcoming: Arc<AtomicBool>,

    /// Truth that the progress bar has been removed from the report
    cleared: Arc<AtomicBool>,
}
//
impl ProgressTracker {
    /// Show that a certain amount of progress has been made
    ///
    /// Returns truth that the progress bar has reached its maximum value
    pub fn make_progress(&self, progress: u64) -> bool {
        self.bar.inc(progress);
        assert!(
            self.bar.position() <= self.bar.length().unwrap_or(0),
            "recorded more progress than expected"
        );
        self.clear_if_done()
    }

    /// Increment the amount of progress that remains to be done
    ///
    /// Note that this operation is disabled by default, and you must enable it
    /// in [`ProgressConfig`]. If you use it, call `done_adding_work()` once you
    /// know no further work will be coming.
    pub fn add_work(&self, remaining: u64) {
        assert!(
            self.upcoming.load(Ordering::Acquire),
            "should not add work after done_adding_work"
        );
        if remaining > 0 && !self.added.swap(true, Ordering::AcqRel) {
            self.report.add(self.bar.clone());
        }
        self.bar.inc_length(remaining);
    }

    /// Promise that add_work will not be called anymore
    ///
    /// This allows for the progress bar to be hidden once full.
    pub fn done_adding_work(&self) {
        assert!(
            self.upcoming.swap(false, Ordering::AcqRel),
            "should only need to freeze remaining work once"
        );
        self.clear_if_done();
    }

    /// Hide the progress bar if all work is known and done
    fn clear_if_done(&self) -> bool {
        let finished = self.bar.position() == self.bar.length().unwrap_or(0)
            && !self.upcoming.load(Ordering::Acquire);
        if finished && !self.cleared.swap(true, Ordering::AcqRel) {
            self.bar.finish_and_clear();
            self.report.remove(&self.bar);
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growing_work() {
        let report = ProgressReport::hidden();
        let files = report.add("Files", ProgressConfig::new(0).allow_adding_work());
        files.add_work(1);
        files.add_work(1);
        assert!(!files.make_progress(1));
        assert!(!files.make_progress(1));
        files.add_work(1);
        files.done_adding_work();
        assert!(files.make_progress(1));
    }

    #[test]
    fn done_adding_after_last_step() {
        let report = ProgressReport::hidden();
        let files = report.add("Files", ProgressConfig::new(2).allow_adding_work());
        assert!(!files.make_progress(2));
        files.done_adding_work();
        assert!(files.clear_if_done());
    }

    #[test]
    #[should_panic]
    fn too_much_progress() {
        let report = ProgressReport::hidden();
        let files = report.add("Files", ProgressConfig::new(1));
        files.make_progress(2);
    }
}
