//! Detected unit of incoming work.

use std::path::PathBuf;

use chrono::{DateTime, Local};

/// Source-specific data carried by a [`WorkItem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkPayload {
    /// A file dropped into the watched folder.
    FileDrop {
        /// Where the file was found.
        source: PathBuf,
        /// Original file name.
        file_name: String,
        /// Size in bytes at detection time.
        size: u64,
    },
}

/// Work detected by a watcher but not yet materialized in the workspace.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Stable identifier (content hash for file drops).
    pub id: String,
    /// Source-specific data.
    pub payload: WorkPayload,
    /// Detection time.
    pub discovered_at: DateTime<Local>,
}

impl WorkItem {
    /// Construct an item discovered now.
    #[must_use]
    pub fn new(id: impl Into<String>, payload: WorkPayload) -> Self {
        Self {
            id: id.into(),
            payload,
            discovered_at: Local::now(),
        }
    }

    /// Human-readable title used for the action file name.
    #[must_use]
    pub fn title(&self) -> &str {
        match &self.payload {
            WorkPayload::FileDrop { file_name, .. } => file_name,
        }
    }
}
