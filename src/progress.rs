//! Progress accounting and the progress-callback trait.
//!
//! [`ProgressState`] is the orchestrator's counter snapshot; [`report`] turns
//! it into a percentage and a status line. Both are pure: every update is a
//! fresh overwrite computed from the counters the session hands over, never a
//! delta applied to hidden state.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the session walks the selection.
//!
//! # Example
//!
//! ```rust
//! use batch2md::{ConversionConfig, ConversionProgressCallback, ProgressReport};
//! use std::sync::Arc;
//!
//! struct PrintingCallback;
//!
//! impl ConversionProgressCallback for PrintingCallback {
//!     fn on_progress(&self, report: &ProgressReport) {
//!         eprintln!("{}", report.status_line());
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(PrintingCallback))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{ConversionResult, OperationStatus, RunReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Counter snapshot of a running conversion. `completed <= total` always.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub completed: usize,
    pub total: usize,
    pub label: String,
}

impl ProgressState {
    /// Build a snapshot; `completed` is clamped to `total`.
    pub fn new(completed: usize, total: usize, label: impl Into<String>) -> Self {
        debug_assert!(completed <= total, "completed {completed} > total {total}");
        Self {
            completed: completed.min(total),
            total,
            label: label.into(),
        }
    }

    pub fn percent(&self) -> u8 {
        percent(self.completed, self.total)
    }
}

/// `round(completed / total * 100)`, clamped to 0–100.
///
/// The session never reports on an empty selection; `total == 0` yields 0.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let ratio = completed.min(total) as f64 / total as f64;
    (ratio * 100.0).round() as u8
}

/// A progress snapshot plus its derived percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub state: ProgressState,
    pub percent: u8,
}

impl ProgressReport {
    /// Human-readable line, e.g. `converting a.txt (50%)`.
    pub fn status_line(&self) -> String {
        format!("{} ({}%)", self.state.label, self.percent)
    }
}

/// Compute the report for `completed` of `total` under `label`.
pub fn report(completed: usize, total: usize, label: impl Into<String>) -> ProgressReport {
    let state = ProgressState::new(completed, total, label);
    let percent = state.percent();
    ProgressReport { state, percent }
}

/// Label published before an item's request is sent.
pub(crate) fn converting_label(name: &str) -> String {
    format!("converting {name}")
}

/// Label published once an item's result is stored.
pub(crate) fn converted_label(name: &str) -> String {
    format!("{name} converted")
}

/// Called by the session as it walks the selection.
///
/// Implementations must be `Send + Sync`: the session may be shared across
/// tasks. All methods have default no-op implementations so callers only
/// override what they care about.
///
/// Callbacks are invoked without any session lock held, so an implementation
/// may read the session (e.g. [`crate::session::ConversionSession::status`])
/// from inside a callback.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once when a run begins.
    ///
    /// # Arguments
    /// * `total`: number of selected files the run will walk
    fn on_run_start(&self, total: usize) {
        let _ = total;
    }

    /// Called with every progress overwrite (before and after each request).
    fn on_progress(&self, report: &ProgressReport) {
        let _ = report;
    }

    /// Called just before the request for an item is sent.
    ///
    /// # Arguments
    /// * `position`: 0-indexed position in the selection
    /// * `total`   : selection size
    /// * `name`    : the file's name
    fn on_item_start(&self, position: usize, total: usize, name: &str) {
        let _ = (position, total, name);
    }

    /// Called when an item converted and its result was stored.
    fn on_item_complete(&self, position: usize, total: usize, result: &ConversionResult) {
        let _ = (position, total, result);
    }

    /// Called when an item's request failed.
    fn on_item_error(&self, position: usize, total: usize, name: &str, error: &str) {
        let _ = (position, total, name, error);
    }

    /// Called whenever the externally observable status changes.
    fn on_status_change(&self, status: &OperationStatus) {
        let _ = status;
    }

    /// Called once when the run reaches `Succeeded` or `Failed`.
    fn on_run_complete(&self, report: &RunReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_matches_rounded_ratio() {
        for total in 1..=40usize {
            for completed in 0..=total {
                let expected = ((completed as f64 / total as f64) * 100.0).round() as u8;
                assert_eq!(percent(completed, total), expected, "{completed}/{total}");
            }
        }
    }

    #[test]
    fn percent_rounds_half_up() {
        // 1/8 = 12.5%
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
    }

    #[test]
    fn percent_bounds() {
        assert_eq!(percent(0, 5), 0);
        assert_eq!(percent(5, 5), 100);
        assert_eq!(percent(0, 0), 0);
    }

    #[test]
    fn report_builds_status_line() {
        let r = report(1, 2, converting_label("b.txt"));
        assert_eq!(r.percent, 50);
        assert_eq!(r.state.completed, 1);
        assert_eq!(r.state.total, 2);
        assert_eq!(r.status_line(), "converting b.txt (50%)");
    }

    #[test]
    fn labels() {
        assert_eq!(converting_label("a.txt"), "converting a.txt");
        assert_eq!(converted_label("a.txt"), "a.txt converted");
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(2);
        cb.on_progress(&report(0, 2, "converting a.txt"));
        cb.on_item_start(0, 2, "a.txt");
        cb.on_item_error(1, 2, "b.txt", "bad encoding");
        cb.on_status_change(&OperationStatus::Idle);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(1);
        cb.on_item_complete(
            0,
            1,
            &ConversionResult {
                text: "# A".into(),
                source_name: "a.txt".into(),
            },
        );
    }
}
