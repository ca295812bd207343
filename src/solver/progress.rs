use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Defines an observer receiving the progress of a solve
///
/// The solver reports after every committed chunk with the percentage of
/// nodes processed so far; the final report of a completed run is always
/// one hundred. Reports arrive on the solver's thread.
pub trait ProgressSink: Send {
    /// Receives the current progress in percent (0 to 100)
    fn on_progress(&mut self, percent: usize);
}

/// Implements a sink discarding all reports
pub struct NullSink {}

/// Implements a sink collecting all reports (handy for tests)
pub struct CollectingSink {
    /// Reported percentages in arrival order
    pub percents: Vec<usize>,
}

impl ProgressSink for NullSink {
    fn on_progress(&mut self, _percent: usize) {}
}

impl CollectingSink {
    /// Allocates a new instance
    pub fn new() -> Self {
        CollectingSink { percents: Vec::new() }
    }
}

impl ProgressSink for CollectingSink {
    fn on_progress(&mut self, percent: usize) {
        self.percents.push(percent);
    }
}

/// Requests the cooperative cancellation of a running solve
///
/// Clones share one flag. Request the cancellation from any clone and the
/// solver stops at the next chunk boundary; chunks already committed stay
/// in the output store and the summary reports the Cancelled state.
#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Allocates a new instance
    pub fn new() -> Self {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests the cancellation
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Indicates whether the cancellation has been requested
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
