//! Output types: the stored conversion result, the session status, and the
//! per-run report.

use crate::error::ConversionError;
use crate::progress::ProgressState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text produced by the most recent successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Converted Markdown, as returned by the service.
    pub text: String,
    /// Name of the file it was converted from.
    pub source_name: String,
}

impl ConversionResult {
    /// Filename to offer when saving this result.
    pub fn suggested_filename(&self) -> String {
        crate::store::suggested_filename(&self.source_name)
    }
}

/// Externally observable state of a [`crate::session::ConversionSession`].
///
/// ```text
/// Idle ──start()──▶ Running ──all ok──▶ Succeeded
///  ▲                   │
///  │                   └──failure──▶ Failed(message)
///  └──── set_selection / add / remove_at ────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum OperationStatus {
    #[default]
    Idle,
    Running(ProgressState),
    Succeeded,
    Failed(String),
}

impl OperationStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, OperationStatus::Running(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Succeeded | OperationStatus::Failed(_))
    }

    /// User-facing status message.
    pub fn message(&self) -> String {
        match self {
            OperationStatus::Idle => "Ready".to_string(),
            OperationStatus::Running(p) => format!("{} ({}%)", p.label, p.percent()),
            OperationStatus::Succeeded => "All files converted".to_string(),
            OperationStatus::Failed(msg) => format!("Conversion failed: {msg}"),
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStatus::Idle => f.write_str("idle"),
            OperationStatus::Running(p) => write!(f, "running {}/{}", p.completed, p.total),
            OperationStatus::Succeeded => f.write_str("succeeded"),
            OperationStatus::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// What happened to one dispatched item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// 0-indexed position in the selection at run start.
    pub position: usize,
    pub source_name: String,
    /// Byte length of the converted text (0 on failure).
    pub output_len: usize,
    /// Wall-clock time of the request.
    pub duration_ms: u64,
    /// `Some` if the request failed.
    pub error: Option<ConversionError>,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of one run, returned by [`crate::session::ConversionSession::start`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Terminal status: `Succeeded` or `Failed`.
    pub status: OperationStatus,
    /// Selection size at run start.
    pub total: usize,
    /// Requests actually sent.
    pub dispatched: usize,
    /// Requests that produced a stored result.
    pub succeeded: usize,
    /// One entry per dispatched item, in dispatch order.
    pub outcomes: Vec<ItemOutcome>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn failed(&self) -> usize {
        self.dispatched - self.succeeded
    }

    /// Items never attempted because the run stopped early.
    pub fn skipped(&self) -> usize {
        self.total - self.dispatched
    }

    pub fn first_error(&self) -> Option<&ConversionError> {
        self.outcomes.iter().find_map(|o| o.error.as_ref())
    }
}
