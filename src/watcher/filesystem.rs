//! Drop-folder watcher.
//!
//! Files dropped into the watched folder are identified by their SHA-256
//! content hash, so the same bytes dropped twice under different names
//! produce a single action file. Materializing an item copies the file
//! into `Files/`, writes the action file into `Needs_Action`, and only then
//! removes the original from the drop folder.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use tempfile::NamedTempFile;
use tracing::{debug, info, info_span, warn};

use super::Watcher;
use crate::models::action_file::{action_file_name, format_size, FileType, FrontMatter};
use crate::models::{ActionFile, WorkItem, WorkPayload};
use crate::state::ProcessedIdSet;
use crate::util::hash_file;
use crate::workspace::{FolderRole, Workspace};
use crate::{AppError, Result};

/// Action file name prefix for file drops.
const ACTION_PREFIX: &str = "FILE";

/// Give up finding a free action file name after this many suffixes.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Watches one folder for dropped files.
#[derive(Debug, Clone)]
pub struct FileDropWatcher {
    drop_folder: PathBuf,
    files_dir: PathBuf,
    needs_action: PathBuf,
}

impl FileDropWatcher {
    /// Watcher over `drop_folder`, or the workspace `Drop` folder when
    /// `None`. The drop folder is created if missing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the drop folder cannot be created.
    pub fn new(workspace: &Workspace, drop_folder: Option<PathBuf>) -> Result<Self> {
        let drop_folder = drop_folder.unwrap_or_else(|| workspace.folder(FolderRole::Drop));
        fs::create_dir_all(&drop_folder).map_err(|err| {
            AppError::Io(format!(
                "failed to create drop folder {}: {err}",
                drop_folder.display()
            ))
        })?;
        Ok(Self {
            drop_folder,
            files_dir: workspace.folder(FolderRole::Files),
            needs_action: workspace.folder(FolderRole::NeedsAction),
        })
    }

    /// Folder being watched.
    #[must_use]
    pub fn drop_folder(&self) -> &Path {
        &self.drop_folder
    }

    /// Visible regular files in the drop folder, sorted by name.
    fn dropped_files(&self) -> Result<Vec<PathBuf>> {
        if !self.drop_folder.exists() {
            return Ok(Vec::new());
        }
        let listing = fs::read_dir(&self.drop_folder).map_err(|err| {
            AppError::Watcher(format!(
                "failed to list {}: {err}",
                self.drop_folder.display()
            ))
        })?;

        let mut files: Vec<PathBuf> = listing
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| !n.starts_with('.'))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Destination for the stored copy. A name already taken in `Files/` by
    /// different content gets a hash suffix (then a counter) instead of
    /// being overwritten; a leftover copy of the same content (from a
    /// failed attempt) is reused.
    fn stored_copy_path(&self, file_name: &str, hash: &str) -> PathBuf {
        let usable = |p: &Path| !p.exists() || hash_file(p).is_ok_and(|h| h == hash);

        let candidate = self.files_dir.join(file_name);
        if usable(&candidate) {
            return candidate;
        }

        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        let ext = path.extension().and_then(|e| e.to_str());
        let short = &hash[..hash.len().min(8)];

        let mut counter = 1u32;
        loop {
            let tag = if counter == 1 {
                format!("{stem}_{short}")
            } else {
                format!("{stem}_{short}_{counter}")
            };
            let candidate = match ext {
                Some(ext) => self.files_dir.join(format!("{tag}.{ext}")),
                None => self.files_dir.join(tag),
            };
            if usable(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Write `content` into `Needs_Action` under the first free name.
    fn write_new_action_file(
        &self,
        title: &str,
        date: chrono::NaiveDate,
        content: &str,
    ) -> Result<PathBuf> {
        let mut tmp = NamedTempFile::new_in(&self.needs_action).map_err(|err| {
            AppError::Watcher(format!(
                "failed to create temporary file in {}: {err}",
                self.needs_action.display()
            ))
        })?;
        tmp.write_all(content.as_bytes())
            .map_err(|err| AppError::Watcher(format!("failed to write action file: {err}")))?;

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let path = self
                .needs_action
                .join(action_file_name(ACTION_PREFIX, title, date, attempt));
            match tmp.persist_noclobber(&path) {
                Ok(_) => return Ok(path),
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                    tmp = err.file;
                }
                Err(err) => {
                    return Err(AppError::Watcher(format!(
                        "failed to persist action file {}: {}",
                        path.display(),
                        err.error
                    )));
                }
            }
        }

        Err(AppError::Watcher(format!(
            "no free action file name for {title} after {MAX_NAME_ATTEMPTS} attempts"
        )))
    }
}

impl Watcher for FileDropWatcher {
    fn name(&self) -> &'static str {
        "FileSystemWatcher"
    }

    fn check_for_updates(&self, processed: &ProcessedIdSet) -> Result<Vec<WorkItem>> {
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for path in self.dropped_files()? {
            let hash = match hash_file(&path) {
                Ok(hash) => hash,
                Err(err) => {
                    warn!(path = %path.display(), %err, "could not hash dropped file");
                    continue;
                }
            };
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_owned();

            if processed.contains(&hash) {
                debug!(file = %file_name, "content already processed");
                continue;
            }
            if !seen.insert(hash.clone()) {
                info!(file = %file_name, hash = %hash, "duplicate content in drop folder, skipping");
                continue;
            }

            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or_default();
            items.push(WorkItem::new(
                hash,
                WorkPayload::FileDrop {
                    source: path,
                    file_name,
                    size,
                },
            ));
        }

        Ok(items)
    }

    fn create_action_file(&self, item: &WorkItem) -> Result<ActionFile> {
        let WorkPayload::FileDrop {
            source, file_name, ..
        } = &item.payload;
        let _span = info_span!("create_action_file", file = %file_name).entered();

        if file_name.is_empty() {
            return Err(AppError::Watcher("dropped file has no name".into()));
        }

        fs::create_dir_all(&self.files_dir).map_err(|err| {
            AppError::Watcher(format!(
                "failed to create {}: {err}",
                self.files_dir.display()
            ))
        })?;
        let destination = self.stored_copy_path(file_name, &item.id);
        fs::copy(source, &destination).map_err(|err| {
            AppError::Watcher(format!(
                "failed to copy {} to {}: {err}",
                source.display(),
                destination.display()
            ))
        })?;
        info!(destination = %destination.display(), "copied dropped file");

        let size = fs::metadata(&destination).map(|m| m.len())?;
        let file_type = FileType::from_extension(source.extension().and_then(|e| e.to_str()));
        let received = item
            .discovered_at
            .to_rfc3339_opts(SecondsFormat::Secs, false);
        let size_human = format_size(size);

        let front_matter = FrontMatter::new()
            .with("type", "file_drop")
            .with("source", file_name)
            .with("destination", destination.display())
            .with("file_type", file_type.as_str())
            .with("size", size)
            .with("size_human", &size_human)
            .with("received", &received)
            .with("priority", "normal")
            .with("status", "pending")
            .with("hash", &item.id);

        let body = format!(
            "# File Drop: {file_name}

A new file has been dropped for processing.

## File Details

- **Type**: {file_type}
- **Size**: {size_human}
- **Received**: {received}
- **Location**: `{location}`

## Suggested Actions

- [ ] Review file content
- [ ] Categorize appropriately
- [ ] Take necessary action
- [ ] Move to /Done when complete

## Notes

<!-- Add notes about this file here -->

---
*Created by {name}*
",
            file_type = file_type.as_str(),
            location = destination.display(),
            name = self.name(),
        );

        let mut action = ActionFile {
            path: PathBuf::new(),
            front_matter,
            body,
        };

        let title = Path::new(item.title())
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        action.path =
            self.write_new_action_file(title, item.discovered_at.date_naive(), &action.render())?;

        if let Err(err) = fs::remove_file(source) {
            warn!(source = %source.display(), %err, "could not remove dropped file");
        } else {
            info!(file = %file_name, "removed from drop folder");
        }

        Ok(action)
    }
}
