//! # batch2md
//!
//! Convert batches of local files to Markdown through a remote conversion
//! service (a markitdown-style HTTP endpoint).
//!
//! The crate is the client-side orchestrator: it holds the user's selection,
//! sends each file to the service one request at a time, reports progress,
//! and keeps the most recent converted text for preview and saving. The
//! conversion itself happens on the server.
//!
//! ## Flow
//!
//! ```text
//! SelectedFile…
//!  │
//!  ├─ 1. Select   ConversionSession::set_selection / add / remove_at
//!  ├─ 2. Run      ConversionSession::start (sequential, fail-fast)
//!  │              one POST /convert per file, progress before and after
//!  ├─ 3. Result   latest success kept in the session's result store
//!  └─ 4. Save     <name>.md via ConversionSession::save_latest
//!
//! ConnectivityProber::probe: independent reachability check
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batch2md::{ConversionConfig, ConversionSession, HttpConversionService, SelectedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .endpoint("http://localhost:8181/convert")
//!         .build()?;
//!     let service = HttpConversionService::new(&config)?;
//!     let session = ConversionSession::new(config);
//!
//!     session.set_selection(vec![
//!         SelectedFile::read("report.docx").await?,
//!         SelectedFile::read("slides.pptx").await?,
//!     ])?;
//!     let report = session.start(&service).await?;
//!     eprintln!("{}", report.status.message());
//!     session.save_latest(".").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `batch2md` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod probe;
pub mod progress;
pub mod selection;
pub mod session;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{ConversionService, HttpConversionService};
pub use config::{ConversionConfig, ConversionConfigBuilder, FailurePolicy, DEFAULT_ENDPOINT};
pub use error::{
    Batch2MdError, ConnectivityError, ConversionError, RunError, SelectionError, UNREACHABLE_HINT,
};
pub use output::{ConversionResult, ItemOutcome, OperationStatus, RunReport};
pub use probe::ConnectivityProber;
pub use progress::{
    ConversionProgressCallback, NoopProgressCallback, ProgressCallback, ProgressReport,
    ProgressState,
};
pub use selection::{CandidateItem, SelectedFile, SelectionManager};
pub use session::ConversionSession;
pub use store::{suggested_filename, ResultStore};
