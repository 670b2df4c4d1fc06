//! Change-notification wake-up for the drop-folder watcher.
//!
//! Subscribes to OS file events on the drop folder using the `notify`
//! crate and turns create/modify events into a [`Notify`] signal. Event
//! delivery is not guaranteed to be exhaustive, so this only shortens the
//! wait before the next scan; the periodic poll stays in charge.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::{AppError, Result};

/// Live subscription; dropping it stops event delivery.
pub struct DropTrigger {
    _watcher: RecommendedWatcher,
    wake: Arc<Notify>,
    dir: PathBuf,
}

impl DropTrigger {
    /// Start watching `dir` (non-recursive).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Watcher` if the OS watcher cannot be created or
    /// the directory cannot be watched.
    pub fn subscribe(dir: &Path) -> Result<Self> {
        let wake = Arc::new(Notify::new());
        let signal = Arc::clone(&wake);

        let mut watcher = notify::recommended_watcher(
            move |result: std::result::Result<Event, notify::Error>| match result {
                Ok(event) => {
                    if is_drop_event(&event) {
                        debug!(paths = ?event.paths, "drop folder change detected");
                        signal.notify_one();
                    }
                }
                Err(err) => {
                    warn!(%err, "file watcher error");
                }
            },
        )
        .map_err(|err| AppError::Watcher(format!("failed to create file watcher: {err}")))?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|err| {
                AppError::Watcher(format!("failed to watch {}: {err}", dir.display()))
            })?;

        info!(dir = %dir.display(), "change notifications enabled");
        Ok(Self {
            _watcher: watcher,
            wake,
            dir: dir.to_owned(),
        })
    }

    /// Signal fired on each relevant event.
    #[must_use]
    pub fn wake(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    /// Watched directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Whether `event` may mean a new dropped file is ready.
fn is_drop_event(event: &Event) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('.'))
        })
}
