//! Holder for the most recent successful conversion.
//!
//! The store keeps zero or one [`ConversionResult`]. Each success overwrites
//! it; only a new selection clears it. After a failed run it still holds the
//! last item that converted, never the one that failed.

use crate::error::Batch2MdError;
use crate::output::ConversionResult;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    current: Option<ConversionResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&ConversionResult> {
        self.current.as_ref()
    }

    /// Replace the stored result.
    pub fn set(&mut self, result: ConversionResult) {
        self.current = Some(result);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Write the stored text to `dir/<suggested filename>`.
    pub async fn save_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, Batch2MdError> {
        let result = self.current.as_ref().ok_or(Batch2MdError::NoResult)?;
        save_result(result, dir).await
    }
}

/// Source name with its final extension replaced by `.md`.
///
/// Only the last path component is kept, so a saved file never lands outside
/// the target directory. Names without an extension (or dot-files such as
/// `.env`) get `.md` appended.
pub fn suggested_filename(source_name: &str) -> String {
    let base = Path::new(source_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "converted".to_string());

    match base.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => format!("{stem}.md"),
        _ => format!("{base}.md"),
    }
}

/// Write `result` into `dir` under its suggested filename.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn save_result(
    result: &ConversionResult,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, Batch2MdError> {
    let dir = dir.as_ref();
    let path = dir.join(result.suggested_filename());

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Batch2MdError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, &result.text)
        .await
        .map_err(|e| Batch2MdError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(|e| Batch2MdError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    info!("Saved {} ({} bytes)", path.display(), result.text.len());
    Ok(path)
}
