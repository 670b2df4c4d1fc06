//! Persisted dedup ledger for watchers.
//!
//! [`ProcessedIdSet`] remembers which work item ids already produced an
//! action file. It is capped; once full, the earliest-inserted ids are
//! evicted first. [`StateStore`] snapshots the set to a single JSON file
//! with temp-file-then-rename writes so a crash never leaves a truncated
//! snapshot behind.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{AppError, Result};

/// Default ledger cap.
pub const DEFAULT_MAX_IDS: usize = 1000;

/// Bounded, insertion-ordered set of processed work item ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedIdSet {
    order: VecDeque<String>,
    members: HashSet<String>,
    cap: usize,
}

impl Default for ProcessedIdSet {
    fn default() -> Self {
        Self::with_cap(DEFAULT_MAX_IDS)
    }
}

impl ProcessedIdSet {
    /// Empty set holding at most `cap` ids (a zero cap is treated as one).
    #[must_use]
    pub fn with_cap(cap: usize) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            cap: cap.max(1),
        }
    }

    /// Build a set from ids listed oldest first, keeping the newest `cap`.
    #[must_use]
    pub fn from_ids<I>(ids: I, cap: usize) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut set = Self::with_cap(cap);
        for id in ids {
            set.insert(id);
        }
        set
    }

    /// Whether `id` has been recorded and not yet evicted.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Record `id`, evicting the oldest entries beyond the cap.
    ///
    /// Returns `false` if the id was already present; its position is
    /// left unchanged in that case.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.members.contains(&id) {
            return false;
        }
        self.members.insert(id.clone());
        self.order.push_back(id);
        while self.order.len() > self.cap {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
        true
    }

    /// Number of ids currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Configured cap.
    #[must_use]
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Ids oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// On-disk snapshot format.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    processed_ids: Vec<String>,
}

/// Loads and saves the ledger snapshot.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    cap: usize,
}

impl StateStore {
    /// Store backed by `path`, producing sets capped at `cap`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            path: path.into(),
            cap,
        }
    }

    /// Snapshot file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ledger.
    ///
    /// A missing, unreadable or malformed snapshot yields an empty set;
    /// the problem is logged and never surfaced as an error.
    #[must_use]
    pub fn load(&self) -> ProcessedIdSet {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no state snapshot, starting fresh");
            return ProcessedIdSet::with_cap(self.cap);
        }

        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "could not read state, starting fresh");
                return ProcessedIdSet::with_cap(self.cap);
            }
        };

        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snapshot) => {
                let set = ProcessedIdSet::from_ids(snapshot.processed_ids, self.cap);
                info!(count = set.len(), "loaded processed ids");
                set
            }
            Err(err) => {
                warn!(path = %self.path.display(), %err, "corrupt state snapshot, starting fresh");
                ProcessedIdSet::with_cap(self.cap)
            }
        }
    }

    /// Write the ledger atomically.
    ///
    /// # Errors
    ///
    /// Returns `AppError::State` if the temp file cannot be written or
    /// renamed over the snapshot.
    pub fn save(&self, set: &ProcessedIdSet) -> Result<()> {
        let snapshot = Snapshot {
            processed_ids: set.iter().map(str::to_owned).collect(),
        };
        let body = serde_json::to_vec(&snapshot)
            .map_err(|err| AppError::State(format!("failed to serialize state: {err}")))?;

        let parent = self
            .path
            .parent()
            .ok_or_else(|| AppError::State("state path has no parent directory".into()))?;

        let mut tmp = NamedTempFile::new_in(parent)
            .map_err(|err| AppError::State(format!("failed to create temporary file: {err}")))?;
        tmp.write_all(&body)
            .map_err(|err| AppError::State(format!("failed to write temporary file: {err}")))?;
        tmp.persist(&self.path).map_err(|err| {
            AppError::State(format!(
                "failed to persist state to {}: {err}",
                self.path.display()
            ))
        })?;

        debug!(count = set.len(), "state saved");
        Ok(())
    }
}
