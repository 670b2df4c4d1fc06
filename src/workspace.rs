//! Workspace directory taxonomy.
//!
//! A workspace is one root directory holding a fixed set of role folders,
//! the dashboard document and the watcher state snapshot. Other modules
//! reach these through [`Workspace`] accessors instead of joining path
//! strings themselves.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{AppError, Result};

/// Dashboard document file name.
pub const DASHBOARD_FILENAME: &str = "Dashboard.md";

/// Hidden dedup ledger snapshot file name.
pub const STATE_FILENAME: &str = ".watcher_state.json";

/// Content written when a workspace has no dashboard yet.
const DEFAULT_DASHBOARD: &str = "# AI Employee Dashboard

Workflow overview for this workspace. Everything below the stats block is
yours to edit; the orchestrator only rewrites the Quick Stats table.

---

## 📊 Quick Stats

| Metric | Value | Status |
|--------|-------|--------|

---

## Recent Activity

";

/// Role of a workspace folder in the task lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderRole {
    /// Generic inbox for manually filed material.
    Inbox,
    /// Folder watched for dropped files.
    Drop,
    /// Copies of dropped files referenced by action files.
    Files,
    /// Action files waiting for the agent.
    NeedsAction,
    /// Multi-step plans written by the agent.
    Plans,
    /// Requests waiting for a human decision.
    PendingApproval,
    /// Requests a human approved.
    Approved,
    /// Requests a human rejected.
    Rejected,
    /// Completed items.
    Done,
    /// Log files and the workflow journal.
    Logs,
}

impl FolderRole {
    /// Every role, in lifecycle order.
    pub const ALL: [Self; 10] = [
        Self::Inbox,
        Self::Drop,
        Self::Files,
        Self::NeedsAction,
        Self::Plans,
        Self::PendingApproval,
        Self::Approved,
        Self::Rejected,
        Self::Done,
        Self::Logs,
    ];

    /// On-disk directory name for this role.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Inbox => "Inbox",
            Self::Drop => "Drop",
            Self::Files => "Files",
            Self::NeedsAction => "Needs_Action",
            Self::Plans => "Plans",
            Self::PendingApproval => "Pending_Approval",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Done => "Done",
            Self::Logs => "Logs",
        }
    }
}

/// Resolved workspace root with typed accessors for every role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open an existing workspace root.
    ///
    /// The root is canonicalized; it is not created.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if `root` does not exist or is not a
    /// directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let canonical = root.canonicalize().map_err(|err| {
            AppError::NotFound(format!("workspace {}: {err}", root.display()))
        })?;
        if !canonical.is_dir() {
            return Err(AppError::NotFound(format!(
                "workspace {} is not a directory",
                canonical.display()
            )));
        }
        Ok(Self { root: canonical })
    }

    /// Open `root` and make sure every role folder exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is missing or a folder cannot be created.
    pub fn init(root: impl AsRef<Path>) -> Result<Self> {
        let workspace = Self::open(root)?;
        workspace.ensure_layout()?;
        Ok(workspace)
    }

    /// Create any missing role folder and seed a dashboard if absent.
    ///
    /// Safe to call repeatedly; existing content is never touched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if a folder or the seed dashboard cannot be
    /// created.
    pub fn ensure_layout(&self) -> Result<()> {
        for role in FolderRole::ALL {
            let dir = self.folder(role);
            fs::create_dir_all(&dir).map_err(|err| {
                AppError::Io(format!("failed to create {}: {err}", dir.display()))
            })?;
        }

        let dashboard = self.dashboard_path();
        if !dashboard.exists() {
            fs::write(&dashboard, DEFAULT_DASHBOARD).map_err(|err| {
                AppError::Io(format!("failed to seed {}: {err}", dashboard.display()))
            })?;
            info!(path = %dashboard.display(), "seeded default dashboard");
        }

        debug!(root = %self.root.display(), "workspace layout ensured");
        Ok(())
    }

    /// Workspace root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for the given role.
    #[must_use]
    pub fn folder(&self, role: FolderRole) -> PathBuf {
        self.root.join(role.dir_name())
    }

    /// Path of the dashboard document.
    #[must_use]
    pub fn dashboard_path(&self) -> PathBuf {
        self.root.join(DASHBOARD_FILENAME)
    }

    /// Path of the dedup ledger snapshot.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILENAME)
    }
}
