//! Error types for the batch2md library.
//!
//! Each component owns a closed error enum carrying only what its message
//! needs:
//!
//! * [`ConversionError`]: a single request to the conversion service failed
//!   (transport, service-side rejection, or an undecodable reply). Recorded in
//!   [`crate::output::ItemOutcome`] and turned into the run's terminal
//!   `Failed(message)` status.
//!
//! * [`ConnectivityError`]: the probe could not confirm the service is up.
//!
//! * [`SelectionError`] / [`RunError`]: caller misuse of the session
//!   (bad index, mutating or starting while a run is active).
//!
//! * [`Batch2MdError`]: crate-level failures outside a run: invalid
//!   configuration, HTTP client construction, writing the saved result.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Checklist shown when the conversion service cannot be reached at all.
pub const UNREACHABLE_HINT: &str = "Please check:\n\
  1. the conversion server is running\n\
  2. the server address and port are correct\n\
  3. no firewall is blocking the connection";

/// Failure of one request to the conversion service.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ConversionError {
    /// The request never completed: DNS failure, refused connection, reset.
    #[error("cannot reach conversion service: {detail}")]
    Transport { detail: String },

    /// The service answered with a non-success status.
    ///
    /// `message` is the `error` field of the JSON body when present.
    #[error("{message}")]
    Service { status: u16, message: String },

    /// A success status arrived but the body could not be decoded.
    #[error("unknown error: {detail}")]
    Unknown { detail: String },
}

impl ConversionError {
    /// Diagnostic checklist for failures that suggest the service is not running.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ConversionError::Transport { .. } => Some(UNREACHABLE_HINT),
            _ => None,
        }
    }

    /// True when the request reached the service.
    pub fn is_service_side(&self) -> bool {
        !matches!(self, ConversionError::Transport { .. })
    }
}

/// Outcome of a failed connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectivityError {
    /// Endpoint unreachable: DNS failure, refused connection, etc.
    #[error("conversion service unreachable: {0}")]
    Unreachable(String),

    /// Service answered but rejected the probe.
    #[error("conversion service rejected the probe: {0}")]
    ServiceRejected(String),

    /// Another probe on the same prober has not resolved yet.
    #[error("a connectivity probe is already in progress")]
    AlreadyProbing,
}

impl ConnectivityError {
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ConnectivityError::Unreachable(_) => Some(UNREACHABLE_HINT),
            _ => None,
        }
    }
}

impl From<ConversionError> for ConnectivityError {
    fn from(e: ConversionError) -> Self {
        match e {
            ConversionError::Transport { detail } => ConnectivityError::Unreachable(detail),
            ConversionError::Service { message, .. } => ConnectivityError::ServiceRejected(message),
            ConversionError::Unknown { detail } => ConnectivityError::ServiceRejected(format!(
                "unreadable acknowledgement: {detail}"
            )),
        }
    }
}

/// Invalid edit of the candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// `remove_at` was given a position past the end of the list.
    #[error("position {position} is out of range (selection has {len} files)")]
    IndexOutOfRange { position: usize, len: usize },

    /// The list was edited while a run is walking it.
    #[error("the selection cannot change while a conversion is running")]
    RunInProgress,
}

/// `start()` was refused; the session is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// The session is not `Idle` (running, or finished and awaiting a new selection).
    #[error("a conversion run is already active or finished (status: {status})")]
    AlreadyRunning { status: String },

    /// Nothing selected.
    #[error("no files selected")]
    EmptySelection,
}

/// Crate-level failures outside a conversion run.
#[derive(Debug, Error)]
pub enum Batch2MdError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be constructed (TLS backend, proxy settings).
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// A local file could not be read into the selection.
    #[error("Failed to read input file '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Nothing has been converted yet.
    #[error("No converted result is available to save")]
    NoResult,

    /// Could not create or write the saved Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
