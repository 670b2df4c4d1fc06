//! Watchers: detect external work and materialize it as action files.
//!
//! A watcher only has to answer two questions, expressed by the
//! [`Watcher`] trait: what is new, and how to turn one new item into an
//! action file. Dedup bookkeeping, state persistence and the polling loop
//! are shared and live in [`runner::WatchLoop`], which holds the watcher,
//! the ledger and the store as plain fields.

pub mod filesystem;
pub mod runner;
pub mod trigger;

use crate::models::{ActionFile, WorkItem};
use crate::state::ProcessedIdSet;
use crate::Result;

pub use filesystem::FileDropWatcher;
pub use runner::WatchLoop;
pub use trigger::DropTrigger;

/// Capability set of a work source.
pub trait Watcher {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Detect new items, excluding every id already in `processed`.
    ///
    /// Must not mark anything as processed or otherwise change state;
    /// calling it twice in a row returns the same items.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read at all. Problems with
    /// individual items are logged and the item skipped.
    fn check_for_updates(&self, processed: &ProcessedIdSet) -> Result<Vec<WorkItem>>;

    /// Write the action file for `item` into the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a malformed item. The caller
    /// leaves the id unregistered so the item is retried next cycle.
    fn create_action_file(&self, item: &WorkItem) -> Result<ActionFile>;
}
