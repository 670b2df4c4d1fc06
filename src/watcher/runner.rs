//! Shared watcher polling loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn};

use super::Watcher;
use crate::journal::{Journal, JournalEntry, WorkflowEvent};
use crate::models::{ActionFile, WorkItem};
use crate::state::{ProcessedIdSet, StateStore};
use crate::Result;

/// Drives one [`Watcher`]: detect, materialize, persist, sleep.
///
/// Owns the dedup ledger. An id is registered only after its action file
/// was written, so a failed item comes back on the next cycle.
pub struct WatchLoop<W: Watcher> {
    watcher: W,
    store: StateStore,
    processed: ProcessedIdSet,
    interval: Duration,
    settle: Duration,
    journal: Option<Box<dyn Journal>>,
}

impl<W: Watcher> WatchLoop<W> {
    /// Loop over `watcher`, loading the ledger from `store`.
    #[must_use]
    pub fn new(watcher: W, store: StateStore, interval: Duration) -> Self {
        let processed = store.load();
        Self {
            watcher,
            store,
            processed,
            interval,
            settle: Duration::ZERO,
            journal: None,
        }
    }

    /// Wait this long after a change notification before scanning.
    #[must_use]
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Record created action files in `journal`.
    #[must_use]
    pub fn with_journal(mut self, journal: Box<dyn Journal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Wrapped watcher.
    #[must_use]
    pub fn watcher(&self) -> &W {
        &self.watcher
    }

    /// Current dedup ledger.
    #[must_use]
    pub fn processed(&self) -> &ProcessedIdSet {
        &self.processed
    }

    /// Materialize one item, registering its id on success only.
    pub fn materialize(&mut self, item: &WorkItem) -> Option<ActionFile> {
        match self.watcher.create_action_file(item) {
            Ok(action) => {
                self.processed.insert(item.id.clone());
                info!(
                    watcher = self.watcher.name(),
                    file = action.file_name(),
                    "created action file"
                );
                if let Some(journal) = &self.journal {
                    let entry = JournalEntry::new(WorkflowEvent::ActionCreated)
                        .with_item(action.file_name())
                        .with_detail(item.id.clone());
                    if let Err(err) = journal.record(entry) {
                        warn!(%err, "failed to journal action file");
                    }
                }
                Some(action)
            }
            Err(err) => {
                error!(
                    watcher = self.watcher.name(),
                    id = %item.id,
                    %err,
                    "could not create action file, will retry next cycle"
                );
                None
            }
        }
    }

    /// One detection pass followed by a state save.
    ///
    /// Returns the action files created.
    ///
    /// # Errors
    ///
    /// Returns an error if detection fails outright or the state cannot be
    /// saved. Per-item failures are logged, not returned.
    pub fn run_cycle(&mut self) -> Result<Vec<ActionFile>> {
        let _span = info_span!("watch_cycle", watcher = self.watcher.name()).entered();

        let items = self.watcher.check_for_updates(&self.processed)?;
        if !items.is_empty() {
            info!(count = items.len(), "found new item(s)");
        }

        let created: Vec<ActionFile> = items
            .iter()
            .filter_map(|item| self.materialize(item))
            .collect();

        self.store.save(&self.processed)?;
        Ok(created)
    }

    /// Save the ledger, logging instead of failing.
    pub fn persist(&self) {
        if let Err(err) = self.store.save(&self.processed) {
            warn!(%err, "could not save state");
        }
    }

    /// Poll until `cancel` fires, then save state and return.
    ///
    /// `wake` is an optional early trigger (file-change notifications);
    /// the periodic poll runs regardless.
    pub async fn run(&mut self, cancel: CancellationToken, wake: Option<Arc<Notify>>) {
        info!(
            watcher = self.watcher.name(),
            interval_secs = self.interval.as_secs(),
            processed = self.processed.len(),
            "watcher starting"
        );

        loop {
            if let Err(err) = self.run_cycle() {
                error!(%err, "error in check cycle");
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
                () = notified(wake.as_deref()) => {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(self.settle) => {}
                    }
                }
            }
        }

        self.persist();
        info!(watcher = self.watcher.name(), "watcher stopped");
    }
}

async fn notified(wake: Option<&Notify>) {
    match wake {
        Some(notify) => notify.notified().await,
        None => std::future::pending().await,
    }
}
