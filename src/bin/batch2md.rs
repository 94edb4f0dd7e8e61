//! CLI binary for batch2md.
//!
//! A thin shim over the library crate: maps CLI flags to
//! `ConversionConfig`, fills the session's selection from file paths, and
//! prints or saves the latest converted result.

use anyhow::{Context, Result};
use batch2md::{
    ConnectivityProber, ConversionConfig, ConversionProgressCallback, ConversionResult,
    ConversionSession, FailurePolicy, HttpConversionService, OperationStatus, ProgressCallback,
    ProgressReport, RunReport, SelectedFile, DEFAULT_ENDPOINT,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar driven by the session's progress
/// overwrites, plus a log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total} files…"))
        ));
    }

    fn on_progress(&self, report: &ProgressReport) {
        self.bar.set_position(u64::from(report.percent));
        self.bar.set_message(report.state.label.clone());
    }

    fn on_item_complete(&self, position: usize, total: usize, result: &ConversionResult) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}  {}",
            green("✓"),
            position + 1,
            total,
            result.source_name,
            dim(&format!("{} chars", result.text.len())),
        ));
    }

    fn on_item_error(&self, position: usize, total: usize, name: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(80) {
            Some((idx, _)) => format!("{}\u{2026}", &error[..idx]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}  {}",
            red("✗"),
            position + 1,
            total,
            name,
            red(&msg),
        ));
    }

    fn on_run_complete(&self, _report: &RunReport) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Check that the conversion server is up
  batch2md --probe

  # Convert one file, print Markdown to stdout
  batch2md report.docx

  # Convert several files, save the last result as slides.md in ./out
  batch2md report.docx slides.pptx -o out

  # Keep going past failures and print a JSON run report
  batch2md --continue-on-error --json *.pdf

SERVER:
  Files are POSTed one at a time as multipart field "file" to
  http://localhost:8181/convert unless --server (or BATCH2MD_SERVER) is set.
  The run stops at the first failing file unless --continue-on-error is set.
"#;

/// Convert local files to Markdown through a conversion server.
#[derive(Parser, Debug)]
#[command(
    name = "batch2md",
    version,
    about = "Convert local files to Markdown through a conversion server",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Files to convert, in order.
    #[arg(required_unless_present = "probe")]
    files: Vec<PathBuf>,

    /// Conversion endpoint URL.
    #[arg(long, env = "BATCH2MD_SERVER", default_value = DEFAULT_ENDPOINT)]
    server: String,

    /// Only test the connection to the server.
    #[arg(long)]
    probe: bool,

    /// Save the latest result into this directory instead of printing it.
    #[arg(short, long, env = "BATCH2MD_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Attempt every file even after a failure.
    #[arg(long, env = "BATCH2MD_CONTINUE_ON_ERROR")]
    continue_on_error: bool,

    /// Per-request timeout in seconds (default: wait indefinitely).
    #[arg(long, env = "BATCH2MD_TIMEOUT")]
    timeout: Option<u64>,

    /// Connect timeout in seconds.
    #[arg(long, env = "BATCH2MD_CONNECT_TIMEOUT")]
    connect_timeout: Option<u64>,

    /// Print the run report as JSON instead of the converted Markdown.
    /// Combined with `-o`, the result is still saved.
    #[arg(long, env = "BATCH2MD_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "BATCH2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BATCH2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BATCH2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports per-file state; keep INFO logs out of
    // its way unless the user asked for verbose output.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.probe;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let service = HttpConversionService::new(&config).context("Failed to set up HTTP client")?;

    // ── Probe-only mode ──────────────────────────────────────────────────
    if cli.probe {
        return match ConnectivityProber::new().probe(&service).await {
            Ok(()) => {
                if !cli.quiet {
                    eprintln!("{} Server connection OK ({})", green("✔"), cli.server);
                }
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("{} {}", red("✘"), e);
                if let Some(hint) = e.hint() {
                    eprintln!("{hint}");
                }
                Ok(ExitCode::FAILURE)
            }
        };
    }

    // ── Selection ────────────────────────────────────────────────────────
    let mut files = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        files.push(SelectedFile::read(path).await?);
    }

    let session = ConversionSession::new(config);
    session.set_selection(files)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let report = session.start(&service).await.context("Conversion did not start")?;

    if let Some(path) = save_if_requested(&session, cli.output_dir.as_deref()).await? {
        if !cli.quiet {
            eprintln!("{} saved {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    match stdout_output(&cli) {
        StdoutOutput::Report => {
            let json =
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
            println!("{json}");
        }
        StdoutOutput::Markdown => {
            if let Some(result) = session.latest_result() {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(result.text.as_bytes())
                    .context("Failed to write to stdout")?;
                // Ensure a trailing newline on stdout.
                if !result.text.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
        }
        StdoutOutput::Nothing => {}
    }

    print_summary(&cli, &report);

    Ok(match report.status {
        OperationStatus::Succeeded => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// What goes to stdout once the run is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StdoutOutput {
    /// The JSON run report (`--json`).
    Report,
    /// The latest converted Markdown.
    Markdown,
    /// Nothing: the result was saved with `-o`.
    Nothing,
}

/// `--json` replaces the Markdown preview; it never suppresses a save.
fn stdout_output(cli: &Cli) -> StdoutOutput {
    if cli.json {
        StdoutOutput::Report
    } else if cli.output_dir.is_some() {
        StdoutOutput::Nothing
    } else {
        StdoutOutput::Markdown
    }
}

/// Save the latest result into `dir` when one was requested and exists.
async fn save_if_requested(
    session: &ConversionSession,
    dir: Option<&Path>,
) -> Result<Option<PathBuf>> {
    let Some(dir) = dir else {
        return Ok(None);
    };
    if session.latest_result().is_none() {
        return Ok(None);
    }
    let path = session
        .save_latest(dir)
        .await
        .context("Failed to save converted Markdown")?;
    Ok(Some(path))
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let policy = if cli.continue_on_error {
        FailurePolicy::ContinueOnError
    } else {
        FailurePolicy::FailFast
    };

    let mut builder = ConversionConfig::builder()
        .endpoint(cli.server.clone())
        .failure_policy(policy);

    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(secs) = cli.connect_timeout {
        builder = builder.connect_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Final status line on stderr, with the connectivity checklist when the
/// server could not be reached.
fn print_summary(cli: &Cli, report: &RunReport) {
    match &report.status {
        OperationStatus::Succeeded => {
            if !cli.quiet {
                eprintln!(
                    "{} {}  {}/{} files  {}ms",
                    green("✔"),
                    report.status.message(),
                    report.succeeded,
                    report.total,
                    report.duration_ms,
                );
            }
        }
        status => {
            eprintln!("{} {}", red("✘"), status.message());
            if report.skipped() > 0 {
                eprintln!("   {} files not attempted", report.skipped());
            }
            if let Some(hint) = report.first_error().and_then(|e| e.hint()) {
                eprintln!("{hint}");
            }
            if report.succeeded > 0 && !cli.quiet {
                eprintln!(
                    "   {}",
                    dim("the last successful result was kept (printed or saved above)")
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_files_and_flags() {
        let cli = Cli::parse_from([
            "batch2md",
            "a.docx",
            "b.pptx",
            "--server",
            "http://10.0.0.2:8181/convert",
            "--continue-on-error",
            "--timeout",
            "30",
        ]);
        assert_eq!(cli.files, vec![PathBuf::from("a.docx"), PathBuf::from("b.pptx")]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.endpoint, "http://10.0.0.2:8181/convert");
        assert_eq!(config.failure_policy, FailurePolicy::ContinueOnError);
        assert_eq!(config.request_timeout_secs, Some(30));
    }

    #[test]
    fn probe_needs_no_files() {
        let cli = Cli::try_parse_from(["batch2md", "--probe"]).unwrap();
        assert!(cli.probe);
        assert!(cli.files.is_empty());
    }

    #[test]
    fn files_required_without_probe() {
        assert!(Cli::try_parse_from(["batch2md", "--json"]).is_err());
    }

    #[test]
    fn json_report_replaces_preview_only() {
        let cli = Cli::try_parse_from(["batch2md", "a.docx", "--json", "-o", "out"]).unwrap();
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert_eq!(stdout_output(&cli), StdoutOutput::Report);

        let cli = Cli::try_parse_from(["batch2md", "a.docx", "-o", "out"]).unwrap();
        assert_eq!(stdout_output(&cli), StdoutOutput::Nothing);

        let cli = Cli::try_parse_from(["batch2md", "a.docx"]).unwrap();
        assert_eq!(stdout_output(&cli), StdoutOutput::Markdown);
    }

    #[tokio::test]
    async fn json_with_output_dir_still_saves() {
        struct Upper;

        #[async_trait::async_trait]
        impl batch2md::ConversionService for Upper {
            async fn probe(&self) -> Result<(), batch2md::ConversionError> {
                Ok(())
            }
            async fn convert(
                &self,
                _name: &str,
                payload: bytes::Bytes,
            ) -> Result<String, batch2md::ConversionError> {
                Ok(String::from_utf8_lossy(&payload).to_uppercase())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let out_arg = out.to_str().unwrap();
        let cli =
            Cli::try_parse_from(["batch2md", "report.docx", "--json", "-o", out_arg]).unwrap();

        let session = ConversionSession::new(build_config(&cli, None).unwrap());
        assert_eq!(save_if_requested(&session, cli.output_dir.as_deref()).await.unwrap(), None);

        session
            .set_selection(vec![SelectedFile::new("report.docx", "quarterly")])
            .unwrap();
        session.start(&Upper).await.unwrap();

        let saved = save_if_requested(&session, cli.output_dir.as_deref())
            .await
            .unwrap()
            .expect("result saved alongside the JSON report");
        assert_eq!(saved, out.join("report.md"));
        assert_eq!(std::fs::read_to_string(saved).unwrap(), "QUARTERLY");
        assert_eq!(stdout_output(&cli), StdoutOutput::Report);
    }

    #[test]
    fn unreachable_hint_is_exported() {
        assert!(batch2md::UNREACHABLE_HINT.contains("port"));
    }
}
