//! Dashboard stats aggregation.
//!
//! The dashboard is a user-owned markdown document. The orchestrator owns
//! exactly one region in it: the Quick Stats block, which starts at the
//! [`STATS_HEADING`] line and ends at the first `---` line after it. Each
//! refresh recomputes the counts from the workflow folders and rewrites
//! only that region.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tempfile::NamedTempFile;
use tracing::{debug, info_span};

use crate::queue::{DirQueue, WorkQueue};
use crate::workspace::{FolderRole, Workspace};
use crate::{AppError, Result};

/// Heading line that opens the stats region.
pub const STATS_HEADING: &str = "## 📊 Quick Stats";

/// Section separator that closes the stats region.
const SEPARATOR: &str = "---";

/// Without an existing region, the block goes after the first separator
/// whose line index is greater than this, skipping title-area rules.
const MIN_INSERT_LINE: usize = 5;

/// Folder counts shown on the dashboard. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    /// Items in `Needs_Action`.
    pub pending: usize,
    /// Items in `Plans`.
    pub planned: usize,
    /// Items in `Pending_Approval`.
    pub awaiting_approval: usize,
    /// Items in `Done` whose name carries today's date.
    pub done_today: usize,
}

impl DashboardStats {
    /// Render the stats block, heading and closing separator included.
    #[must_use]
    pub fn render_block(&self) -> Vec<String> {
        let pending_status = if self.pending == 0 {
            "✅ Clear".to_owned()
        } else {
            format!("⚠️ {} item(s)", self.pending)
        };
        let plans_status = if self.planned == 0 {
            "✅ Clear".to_owned()
        } else {
            format!("📋 {} in progress", self.planned)
        };
        let approval_status = if self.awaiting_approval == 0 {
            "✅ Clear".to_owned()
        } else {
            format!("⏳ {} awaiting", self.awaiting_approval)
        };
        let done_status = if self.done_today > 0 {
            format!("📈 {} done", self.done_today)
        } else {
            "📊 No activity".to_owned()
        };

        vec![
            STATS_HEADING.to_owned(),
            String::new(),
            "| Metric | Value | Status |".to_owned(),
            "|--------|-------|--------|".to_owned(),
            format!("| Pending Tasks | {} | {pending_status} |", self.pending),
            format!("| Active Plans | {} | {plans_status} |", self.planned),
            format!(
                "| Awaiting Approval | {} | {approval_status} |",
                self.awaiting_approval
            ),
            format!(
                "| Tasks Completed Today | {} | {done_status} |",
                self.done_today
            ),
            String::new(),
            SEPARATOR.to_owned(),
        ]
    }
}

/// Replace (or insert) the stats region of `document` with `block`.
///
/// Only the first [`STATS_HEADING`] is treated as the region start. A
/// heading without a closing separator extends the region to the end of
/// the document. Without a heading the block is inserted after the first
/// separator past [`MIN_INSERT_LINE`], or appended when there is none.
#[must_use]
pub fn splice_stats(document: &str, block: &[String]) -> String {
    let lines: Vec<&str> = document.split('\n').collect();
    let block = block.iter().map(String::as_str);

    if let Some(start) = lines.iter().position(|l| l.trim() == STATS_HEADING) {
        let end = lines[start + 1..]
            .iter()
            .position(|l| l.trim() == SEPARATOR)
            .map(|offset| start + 1 + offset);

        let mut out: Vec<&str> = lines[..start].to_vec();
        out.extend(block);
        if let Some(end) = end {
            out.extend_from_slice(&lines[end + 1..]);
        }
        return out.join("\n");
    }

    let anchor = lines
        .iter()
        .enumerate()
        .position(|(i, l)| i > MIN_INSERT_LINE && l.trim() == SEPARATOR);

    if let Some(anchor) = anchor {
        let mut out: Vec<&str> = lines[..=anchor].to_vec();
        out.extend(block);
        out.extend_from_slice(&lines[anchor + 1..]);
        return out.join("\n");
    }

    let trailing_newline = document.ends_with('\n');
    let mut out = lines;
    if trailing_newline {
        out.pop();
    }
    if out.last().is_some_and(|l| !l.trim().is_empty()) {
        out.push("");
    }
    out.extend(block);
    if trailing_newline {
        out.push("");
    }
    out.join("\n")
}

/// Recomputes and rewrites the dashboard stats region.
#[derive(Debug, Clone)]
pub struct Dashboard {
    path: PathBuf,
    needs_action: DirQueue,
    plans: DirQueue,
    pending_approval: DirQueue,
    done: PathBuf,
}

impl Dashboard {
    /// Dashboard for `workspace`.
    #[must_use]
    pub fn new(workspace: &Workspace) -> Self {
        Self {
            path: workspace.dashboard_path(),
            needs_action: DirQueue::new(workspace.folder(FolderRole::NeedsAction)),
            plans: DirQueue::new(workspace.folder(FolderRole::Plans)),
            pending_approval: DirQueue::new(workspace.folder(FolderRole::PendingApproval)),
            done: workspace.folder(FolderRole::Done),
        }
    }

    /// Dashboard document path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count folder contents as of `today`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if a folder cannot be listed.
    pub fn compute_stats(&self, today: NaiveDate) -> Result<DashboardStats> {
        let stamp = today.format("%Y-%m-%d").to_string();
        Ok(DashboardStats {
            pending: self.needs_action.count()?,
            planned: self.plans.count()?,
            awaiting_approval: self.pending_approval.count()?,
            done_today: self.count_done_on(&stamp)?,
        })
    }

    /// Entries of any kind in `Done` whose name contains `stamp`.
    fn count_done_on(&self, stamp: &str) -> Result<usize> {
        let listing = std::fs::read_dir(&self.done).map_err(|err| {
            AppError::Io(format!("failed to list {}: {err}", self.done.display()))
        })?;
        Ok(listing
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().contains(stamp))
            .count())
    }

    /// Recompute stats and rewrite the stats region.
    ///
    /// The file is only written when its content changes.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the dashboard is missing and
    /// `AppError::Dashboard` / `AppError::Io` on read, count or write
    /// failures. Callers log these and carry on.
    pub fn refresh(&self) -> Result<DashboardStats> {
        let _span = info_span!("dashboard_refresh").entered();

        if !self.path.exists() {
            return Err(AppError::NotFound(format!(
                "dashboard {} not found",
                self.path.display()
            )));
        }

        let stats = self.compute_stats(Local::now().date_naive())?;

        let current = std::fs::read_to_string(&self.path).map_err(|err| {
            AppError::Dashboard(format!("failed to read {}: {err}", self.path.display()))
        })?;
        let updated = splice_stats(&current, &stats.render_block());

        if updated == current {
            debug!(?stats, "dashboard unchanged");
            return Ok(stats);
        }

        self.write_atomic(&updated)?;
        debug!(?stats, "dashboard updated");
        Ok(stats)
    }

    fn write_atomic(&self, content: &str) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| AppError::Dashboard("dashboard path has no parent".into()))?;
        let mut tmp = NamedTempFile::new_in(parent)
            .map_err(|err| AppError::Dashboard(format!("failed to create temporary file: {err}")))?;
        tmp.write_all(content.as_bytes())
            .map_err(|err| AppError::Dashboard(format!("failed to write temporary file: {err}")))?;
        tmp.persist(&self.path).map_err(|err| {
            AppError::Dashboard(format!(
                "failed to persist {}: {err}",
                self.path.display()
            ))
        })?;
        Ok(())
    }
}
