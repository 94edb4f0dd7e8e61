//! The ordered candidate list.
//!
//! Insertion order is conversion order. Positions are always the current
//! index: every removal re-indexes the entries after the gap. The list itself
//! does no I/O; [`SelectedFile::read`] is the one helper that loads a file
//! from disk for callers that start from paths.

use crate::error::{Batch2MdError, SelectionError};
use bytes::Bytes;
use std::path::Path;
use tracing::debug;

/// A named binary blob handed over by the file picker (or the CLI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub payload: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Read a local file; the selection name is its final path component.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self, Batch2MdError> {
        let path = path.as_ref();
        let payload = tokio::fs::read(path)
            .await
            .map_err(|e| Batch2MdError::InputReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!("Read {} ({} bytes)", name, payload.len());
        Ok(Self::new(name, payload))
    }
}

/// A file selected but not yet converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    pub name: String,
    /// Shared with the in-flight request; cloning is cheap.
    pub payload: Bytes,
    /// Current index in the list.
    pub position: usize,
}

/// Ordered candidate list with positional removal.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    items: Vec<CandidateItem>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list.
    pub fn set_selection(&mut self, files: impl IntoIterator<Item = SelectedFile>) {
        self.items = files
            .into_iter()
            .enumerate()
            .map(|(position, f)| CandidateItem {
                name: f.name,
                payload: f.payload,
                position,
            })
            .collect();
    }

    /// Append one file (duplicates allowed). Returns its position.
    pub fn add(&mut self, file: SelectedFile) -> usize {
        let position = self.items.len();
        self.items.push(CandidateItem {
            name: file.name,
            payload: file.payload,
            position,
        });
        position
    }

    /// Remove the entry at `position`, closing the gap.
    ///
    /// Out-of-range positions leave the list untouched.
    pub fn remove_at(&mut self, position: usize) -> Result<CandidateItem, SelectionError> {
        if position >= self.items.len() {
            return Err(SelectionError::IndexOutOfRange {
                position,
                len: self.items.len(),
            });
        }
        let removed = self.items.remove(position);
        for item in &mut self.items[position..] {
            item.position -= 1;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// True iff there is something to convert.
    pub fn is_ready(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&CandidateItem> {
        self.items.get(position)
    }

    pub fn items(&self) -> &[CandidateItem] {
        &self.items
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.name.as_str()).collect()
    }
}
