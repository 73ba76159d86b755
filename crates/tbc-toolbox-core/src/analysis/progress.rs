use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Progress sink and cancellation source for long-running analyses.
///
/// Callbacks are synchronous and are invoked between fields (or chunks of fields); an analysis
/// checks [`AnalysisProgress::is_cancelled`] at those points and before expensive steps, and
/// winds down cooperatively when it returns true.
pub trait AnalysisProgress: Send + Sync {
    /// Reports the current top-level activity.
    fn set_status(&self, _status: &str) {}

    /// Reports fine-grained activity under the current status.
    fn set_sub_status(&self, _sub_status: &str) {}

    /// Reports completion, 0-100.
    fn set_progress(&self, _pct: u8) {}

    /// Whether the caller has requested cancellation.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A progress sink that ignores everything and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl AnalysisProgress for NullProgress {}

/// A cancellation token usable as a progress sink.
///
/// Clones share the flag, so one side can hand the token to an analysis and trip it from
/// another thread.
#[derive(Debug, Default, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates an untripped token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl AnalysisProgress for CancelToken {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl fmt::Display for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.is_cancelled() { "cancelled" } else { "running" })
    }
}
