//! Directory-backed work queues.
//!
//! Workflow stages are plain folders; the items queued in a stage are the
//! markdown files inside it. [`WorkQueue`] hides the listing behind an
//! enumerate-and-filter contract so callers do not depend on the folder
//! representation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::{AppError, Result};

/// Extension of queued item files.
pub const ITEM_EXTENSION: &str = "md";

/// One item currently sitting in a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Full path of the item file.
    pub path: PathBuf,
    /// File name, used as the item's display name.
    pub name: String,
    /// Last modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
}

/// Enumerate-and-filter view over a workflow stage.
pub trait WorkQueue {
    /// All items in the stage, oldest modification first.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage cannot be listed.
    fn entries(&self) -> Result<Vec<QueueEntry>>;

    /// Items for which `keep` returns `true`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage cannot be listed.
    fn entries_filtered<F>(&self, keep: F) -> Result<Vec<QueueEntry>>
    where
        F: Fn(&QueueEntry) -> bool,
    {
        Ok(self.entries()?.into_iter().filter(|e| keep(e)).collect())
    }

    /// Number of items in the stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage cannot be listed.
    fn count(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }
}

/// Queue whose items are the visible `*.md` files of one directory.
#[derive(Debug, Clone)]
pub struct DirQueue {
    dir: PathBuf,
}

impl DirQueue {
    /// Queue over `dir`. The directory is not created.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Backing directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl WorkQueue for DirQueue {
    /// A missing directory is an empty queue.
    fn entries(&self) -> Result<Vec<QueueEntry>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let listing = fs::read_dir(&self.dir).map_err(|err| {
            AppError::Io(format!("failed to list {}: {err}", self.dir.display()))
        })?;

        let mut entries = Vec::new();
        for dirent in listing {
            let dirent = dirent.map_err(|err| {
                AppError::Io(format!("failed to read {}: {err}", self.dir.display()))
            })?;
            let path = dirent.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_owned) else {
                continue;
            };
            if !is_queue_item(&path, &name) {
                continue;
            }
            let modified = dirent.metadata().ok().and_then(|m| m.modified().ok());
            entries.push(QueueEntry {
                path,
                name,
                modified,
            });
        }

        entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }
}

fn is_queue_item(path: &Path, name: &str) -> bool {
    !name.starts_with('.')
        && path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ITEM_EXTENSION))
}
