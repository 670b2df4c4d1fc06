//! Structured workflow journal.
//!
//! Records workflow transitions the core observes or causes (action file
//! created, dispatch outcome, approved item seen) as JSONL lines in
//! `Logs/workflow-YYYY-MM-DD.jsonl`. The journal complements tracing
//! output with a machine-readable history per day.

pub mod writer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event classification for journal entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// A watcher materialized an action file.
    ActionCreated,
    /// The agent accepted a dispatch batch.
    DispatchSucceeded,
    /// A dispatch batch failed and stays pending.
    DispatchFailed,
    /// An item in `Approved` is ready for downstream action.
    ApprovalReady,
}

/// One journal line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// ISO 8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event classification.
    pub event: WorkflowEvent,
    /// File name or id of the item concerned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    /// Items covered by a dispatch batch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub batch: Vec<String>,
    /// Free-form detail (outcome, item type).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl JournalEntry {
    /// Minimal entry for `event`, timestamped now.
    #[must_use]
    pub fn new(event: WorkflowEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
            item: None,
            batch: Vec::new(),
            detail: None,
        }
    }

    /// Set the item this entry is about.
    #[must_use]
    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    /// Set the dispatch batch members.
    #[must_use]
    pub fn with_batch(mut self, batch: Vec<String>) -> Self {
        self.batch = batch;
        self
    }

    /// Set the detail text.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Sink for journal entries.
pub trait Journal {
    /// Record one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    fn record(&self, entry: JournalEntry) -> crate::Result<()>;
}

pub use writer::JsonlJournal;
