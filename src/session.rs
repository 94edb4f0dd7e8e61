//! The conversion session: selection, status, and result store behind one
//! owned object, plus the sequential run loop.
//!
//! ## Run loop
//!
//! ```text
//! for item i of n (selection order):
//!   publish  i/n   "converting <name>"
//!   await    service.convert(name, payload)     one request in flight
//!   ok   →   store result, publish i+1/n "<name> converted"
//!   err  →   FailFast: status = Failed(message), stop
//!            ContinueOnError: record, publish i+1/n, go on
//! all ok →   clear selection, status = Succeeded
//! ```
//!
//! The state lives behind a mutex so a presentation layer can read status
//! and the latest result while a run is suspended on a request. The lock is
//! never held across an `.await` or while a callback runs.

use crate::client::ConversionService;
use crate::config::{ConversionConfig, FailurePolicy};
use crate::error::{Batch2MdError, ConversionError, RunError, SelectionError};
use crate::output::{ConversionResult, ItemOutcome, OperationStatus, RunReport};
use crate::progress::{self, ConversionProgressCallback};
use crate::selection::{CandidateItem, SelectedFile, SelectionManager};
use crate::store::{self, ResultStore};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct SessionState {
    selection: SelectionManager,
    results: ResultStore,
    status: OperationStatus,
}

/// Owned state of one user's conversion workflow.
///
/// # Example
/// ```rust,no_run
/// use batch2md::{ConversionConfig, ConversionSession, HttpConversionService, SelectedFile};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConversionConfig::default();
/// let service = HttpConversionService::new(&config)?;
/// let session = ConversionSession::new(config);
///
/// session.set_selection(vec![SelectedFile::read("slides.pptx").await?])?;
/// let report = session.start(&service).await?;
/// println!("{}", report.status.message());
/// if let Some(result) = session.latest_result() {
///     println!("{}", result.text);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConversionSession {
    config: ConversionConfig,
    state: Mutex<SessionState>,
}

impl ConversionSession {
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    // ── Selection ────────────────────────────────────────────────────────

    /// Replace the selection. Clears the stored result and returns to `Idle`.
    pub fn set_selection(
        &self,
        files: impl IntoIterator<Item = SelectedFile>,
    ) -> Result<(), SelectionError> {
        self.edit_selection(|sel| {
            sel.set_selection(files);
            Ok(())
        })
    }

    /// Append one file. Clears the stored result and returns to `Idle`.
    pub fn add(&self, file: SelectedFile) -> Result<usize, SelectionError> {
        self.edit_selection(|sel| Ok(sel.add(file)))
    }

    /// Remove the file at `position`. On success clears the stored result and
    /// returns to `Idle`; an out-of-range position changes nothing.
    pub fn remove_at(&self, position: usize) -> Result<CandidateItem, SelectionError> {
        self.edit_selection(|sel| sel.remove_at(position))
    }

    /// Drop every selected file.
    pub fn clear_selection(&self) -> Result<(), SelectionError> {
        self.edit_selection(|sel| {
            sel.clear();
            Ok(())
        })
    }

    /// True iff something is selected.
    pub fn is_ready(&self) -> bool {
        self.lock().selection.is_ready()
    }

    /// True iff `start()` would begin a run now: something is selected and
    /// the status is `Idle`.
    pub fn can_start(&self) -> bool {
        let state = self.lock();
        state.selection.is_ready() && state.status == OperationStatus::Idle
    }

    /// Snapshot of the selection in conversion order.
    pub fn selection(&self) -> Vec<CandidateItem> {
        self.lock().selection.items().to_vec()
    }

    pub fn status(&self) -> OperationStatus {
        self.lock().status.clone()
    }

    /// The most recent successful conversion, if any.
    pub fn latest_result(&self) -> Option<ConversionResult> {
        self.lock().results.get().cloned()
    }

    /// Save the latest result into `dir` under its suggested filename.
    pub async fn save_latest(&self, dir: impl AsRef<Path>) -> Result<PathBuf, Batch2MdError> {
        let result = self.latest_result().ok_or(Batch2MdError::NoResult)?;
        store::save_result(&result, dir).await
    }

    // ── Run ──────────────────────────────────────────────────────────────

    /// Convert every selected file, one request at a time, in order.
    ///
    /// # Errors
    /// Returns `Err(RunError)` only when the run cannot begin: the status is
    /// not `Idle`, or nothing is selected. Conversion failures do not surface
    /// here; they end the run in `Failed(message)` and are listed in the
    /// returned [`RunReport`].
    pub async fn start(&self, service: &dyn ConversionService) -> Result<RunReport, RunError> {
        let run_start = Instant::now();

        let items = {
            let mut state = self.lock();
            if state.status != OperationStatus::Idle {
                return Err(RunError::AlreadyRunning {
                    status: state.status.to_string(),
                });
            }
            if !state.selection.is_ready() {
                return Err(RunError::EmptySelection);
            }
            let items = state.selection.items().to_vec();
            state.status = OperationStatus::Running(progress::ProgressState::new(
                0,
                items.len(),
                progress::converting_label(&items[0].name),
            ));
            items
        };
        let total = items.len();
        let mut guard = RunGuard {
            session: self,
            armed: true,
        };

        info!("Starting conversion of {} files", total);
        self.notify(|cb| cb.on_run_start(total));
        self.notify_status();

        let mut outcomes: Vec<ItemOutcome> = Vec::with_capacity(total);
        let mut first_error: Option<ConversionError> = None;

        for item in &items {
            let position = item.position;
            self.publish_progress(position, total, progress::converting_label(&item.name));
            self.notify(|cb| cb.on_item_start(position, total, &item.name));

            let item_start = Instant::now();
            let reply = service.convert(&item.name, item.payload.clone()).await;
            let duration_ms = item_start.elapsed().as_millis() as u64;

            match reply {
                Ok(text) => {
                    debug!(
                        "{}: {} bytes of Markdown in {}ms",
                        item.name,
                        text.len(),
                        duration_ms
                    );
                    let result = ConversionResult {
                        text,
                        source_name: item.name.clone(),
                    };
                    let output_len = result.text.len();
                    self.lock().results.set(result.clone());
                    self.notify(|cb| cb.on_item_complete(position, total, &result));
                    self.publish_progress(
                        position + 1,
                        total,
                        progress::converted_label(&item.name),
                    );
                    outcomes.push(ItemOutcome {
                        position,
                        source_name: item.name.clone(),
                        output_len,
                        duration_ms,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!("{}: conversion failed: {}", item.name, e);
                    let message = e.to_string();
                    self.notify(|cb| cb.on_item_error(position, total, &item.name, &message));
                    outcomes.push(ItemOutcome {
                        position,
                        source_name: item.name.clone(),
                        output_len: 0,
                        duration_ms,
                        error: Some(e.clone()),
                    });
                    first_error.get_or_insert(e);

                    match self.config.failure_policy {
                        FailurePolicy::FailFast => break,
                        FailurePolicy::ContinueOnError => self.publish_progress(
                            position + 1,
                            total,
                            format!("{} failed", item.name),
                        ),
                    }
                }
            }
        }

        let dispatched = outcomes.len();
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let status = match first_error {
            None => OperationStatus::Succeeded,
            Some(e) => match self.config.failure_policy {
                FailurePolicy::FailFast => OperationStatus::Failed(e.to_string()),
                FailurePolicy::ContinueOnError => OperationStatus::Failed(format!(
                    "{} of {} files failed; first error: {}",
                    dispatched - succeeded,
                    total,
                    e
                )),
            },
        };

        {
            let mut state = self.lock();
            if status == OperationStatus::Succeeded {
                state.selection.clear();
            }
            state.status = status.clone();
        }
        guard.armed = false;
        self.notify_status();

        let report = RunReport {
            status,
            total,
            dispatched,
            succeeded,
            outcomes,
            duration_ms: run_start.elapsed().as_millis() as u64,
        };
        info!(
            "Run finished: {}/{} converted, {} not attempted, {}ms",
            report.succeeded,
            report.total,
            report.skipped(),
            report.duration_ms
        );
        self.notify(|cb| cb.on_run_complete(&report));
        Ok(report)
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn edit_selection<T>(
        &self,
        edit: impl FnOnce(&mut SelectionManager) -> Result<T, SelectionError>,
    ) -> Result<T, SelectionError> {
        let changed_status = {
            let mut state = self.lock();
            if state.status.is_running() {
                return Err(SelectionError::RunInProgress);
            }
            let out = edit(&mut state.selection)?;
            state.results.clear();
            let changed = state.status != OperationStatus::Idle;
            state.status = OperationStatus::Idle;
            (out, changed)
        };
        let (out, changed) = changed_status;
        if changed {
            self.notify_status();
        }
        Ok(out)
    }

    /// Overwrite the running progress and tell the callback.
    fn publish_progress(&self, completed: usize, total: usize, label: String) {
        let report = progress::report(completed, total, label);
        self.lock().status = OperationStatus::Running(report.state.clone());
        debug!("{}", report.status_line());
        self.notify(|cb| cb.on_progress(&report));
    }

    fn notify_status(&self) {
        let status = self.status();
        self.notify(|cb| cb.on_status_change(&status));
    }

    fn notify(&self, f: impl FnOnce(&dyn ConversionProgressCallback)) {
        if let Some(ref cb) = self.config.progress_callback {
            f(cb.as_ref());
        }
    }
}

/// Marks the run `Failed` if its future is dropped before reaching a
/// terminal status, so the session never stays stuck in `Running`.
struct RunGuard<'a> {
    session: &'a ConversionSession,
    armed: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.session.lock();
            if state.status.is_running() {
                state.status = OperationStatus::Failed("conversion run was interrupted".into());
            }
        }
    }
}
