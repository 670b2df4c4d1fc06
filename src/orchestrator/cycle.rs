//! The orchestrator cycle.
//!
//! Fixed order per cycle: refresh dashboard, dispatch pending action
//! files in one batch, report approved items, refresh dashboard again.
//! [`Orchestrator::run`] repeats cycles until cancelled; a failed cycle is
//! logged and followed by a short backoff, never by an exit.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::dispatcher::{AgentDispatch, TaskDispatcher};
use crate::config::GlobalConfig;
use crate::dashboard::{Dashboard, DashboardStats};
use crate::journal::{Journal, JournalEntry, WorkflowEvent};
use crate::models::action_file::FrontMatter;
use crate::models::dispatch::{DispatchRequest, DispatchResult};
use crate::queue::{DirQueue, QueueEntry, WorkQueue};
use crate::workspace::{FolderRole, Workspace};
use crate::Result;

/// What one cycle observed and did.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Dashboard stats after the final refresh, if it succeeded.
    pub stats: Option<DashboardStats>,
    /// Names offered to the agent this cycle.
    pub batch: Vec<String>,
    /// Dispatch result, when a batch was sent.
    pub dispatch: Option<DispatchResult>,
    /// Names of items sitting in `Approved`.
    pub approved: Vec<String>,
}

/// Advances the workspace by dispatching work to the agent.
pub struct Orchestrator<D: AgentDispatch = TaskDispatcher> {
    workspace: Workspace,
    dashboard: Dashboard,
    needs_action: DirQueue,
    approved: DirQueue,
    dispatcher: D,
    /// Items the agent accepted during this process's lifetime. Not
    /// persisted: after a restart, items still present are offered again.
    dispatched: HashSet<PathBuf>,
    announced: HashSet<PathBuf>,
    journal: Option<Box<dyn Journal>>,
    interval: Duration,
    backoff: Duration,
}

impl<D: AgentDispatch> Orchestrator<D> {
    /// Orchestrator over `workspace` using `dispatcher`.
    #[must_use]
    pub fn new(workspace: Workspace, dispatcher: D, config: &GlobalConfig) -> Self {
        Self {
            dashboard: Dashboard::new(&workspace),
            needs_action: DirQueue::new(workspace.folder(FolderRole::NeedsAction)),
            approved: DirQueue::new(workspace.folder(FolderRole::Approved)),
            workspace,
            dispatcher,
            dispatched: HashSet::new(),
            announced: HashSet::new(),
            journal: None,
            interval: config.check_interval(),
            backoff: config.error_backoff(),
        }
    }

    /// Record dispatch and approval events in `journal`.
    #[must_use]
    pub fn with_journal(mut self, journal: Box<dyn Journal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Workspace being orchestrated.
    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Underlying dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Whether `path` was accepted by the agent during this run.
    #[must_use]
    pub fn is_dispatched(&self, path: &std::path::Path) -> bool {
        self.dispatched.contains(path)
    }

    /// Refresh the dashboard, logging failures.
    #[must_use]
    pub fn refresh_dashboard(&self) -> Option<DashboardStats> {
        match self.dashboard.refresh() {
            Ok(stats) => Some(stats),
            Err(err) => {
                warn!(%err, "could not update dashboard");
                None
            }
        }
    }

    /// `Needs_Action` items not yet accepted by the agent, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if `Needs_Action` cannot be listed.
    pub fn pending_items(&self) -> Result<Vec<QueueEntry>> {
        self.needs_action
            .entries_filtered(|entry| !self.dispatched.contains(&entry.path))
    }

    /// Prompt body listing a dispatch batch.
    #[must_use]
    pub fn build_manifest(batch: &[QueueEntry]) -> DispatchRequest {
        let mut body = format!(
            "I have {} new item(s) to process in /Needs_Action:\n\n",
            batch.len()
        );
        for entry in batch {
            let _ = writeln!(body, "- {}", entry.name);
        }
        body.push_str(
            "
Please:
1. Read each file carefully
2. Determine the appropriate action based on Company_Handbook.md
3. Create a plan in /Plans if multiple steps are needed
4. Execute simple tasks directly
5. Create approval requests in /Pending_Approval for sensitive actions
6. Move completed items to /Done
7. Update Dashboard.md

Start processing now.
",
        );
        DispatchRequest::new(body)
    }

    /// Offer all pending items to the agent in one dispatch.
    ///
    /// On success every listed item is marked dispatched for this run; on
    /// failure all of them stay pending for the next cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if `Needs_Action` cannot be listed. Dispatch
    /// failures are reported in the returned result, not as errors.
    pub async fn process_pending(&mut self) -> Result<(Vec<String>, Option<DispatchResult>)> {
        self.dispatched.retain(|path| path.exists());

        let pending = self.pending_items()?;
        if pending.is_empty() {
            debug!("no pending items to process");
            return Ok((Vec::new(), None));
        }

        let names: Vec<String> = pending.iter().map(|e| e.name.clone()).collect();
        info!(count = pending.len(), "found pending item(s)");

        let request = Self::build_manifest(&pending);
        let result = self.dispatcher.dispatch(&request).await;

        if result.succeeded() {
            for entry in pending {
                self.dispatched.insert(entry.path);
            }
            info!(count = names.len(), "agent accepted batch");
            self.journal(
                JournalEntry::new(WorkflowEvent::DispatchSucceeded).with_batch(names.clone()),
            );
        } else {
            warn!(outcome = %result.outcome, "agent processing failed, items remain pending");
            self.journal(
                JournalEntry::new(WorkflowEvent::DispatchFailed)
                    .with_batch(names.clone())
                    .with_detail(result.outcome.to_string()),
            );
        }

        Ok((names, Some(result)))
    }

    /// Log every item in `Approved` as ready for downstream action.
    ///
    /// Nothing else happens to approved items at this tier. Each item is
    /// journaled once per run.
    ///
    /// # Errors
    ///
    /// Returns an error if `Approved` cannot be listed.
    pub fn check_approvals(&mut self) -> Result<Vec<String>> {
        let entries = self.approved.entries()?;
        self.announced.retain(|path| path.exists());

        let mut names = Vec::with_capacity(entries.len());
        for entry in entries {
            let kind = std::fs::read_to_string(&entry.path)
                .ok()
                .and_then(|text| FrontMatter::parse(&text))
                .and_then(|front| front.get("type").map(str::to_owned))
                .unwrap_or_else(|| "unknown".to_owned());
            info!(item = %entry.name, kind = %kind, "approved item ready");

            if self.announced.insert(entry.path.clone()) {
                self.journal(
                    JournalEntry::new(WorkflowEvent::ApprovalReady)
                        .with_item(entry.name.clone())
                        .with_detail(kind),
                );
            }
            names.push(entry.name);
        }
        Ok(names)
    }

    /// Run exactly one cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if a workflow folder cannot be listed. Dashboard
    /// and dispatch problems are logged and do not fail the cycle.
    pub async fn run_once(&mut self) -> Result<CycleReport> {
        let span = info_span!("orchestrator_cycle");
        async {
            let _ = self.refresh_dashboard();
            let (batch, dispatch) = self.process_pending().await?;
            let approved = self.check_approvals()?;
            let stats = self.refresh_dashboard();
            Ok(CycleReport {
                stats,
                batch,
                dispatch,
                approved,
            })
        }
        .instrument(span)
        .await
    }

    /// Cycle until `cancel` fires.
    ///
    /// A cycle error is logged and followed by the backoff pause; the loop
    /// itself only ends on cancellation.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(
            workspace = %self.workspace.root().display(),
            interval_secs = self.interval.as_secs(),
            "orchestrator starting"
        );

        loop {
            let outcome = tokio::select! {
                () = cancel.cancelled() => break,
                outcome = self.run_once() => outcome,
            };

            let pause = match outcome {
                Ok(_) => self.interval,
                Err(err) => {
                    error!(error = ?err, "error in orchestration cycle");
                    self.backoff
                }
            };

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(pause) => {}
            }
        }

        info!("orchestrator stopped");
    }

    fn journal(&self, entry: JournalEntry) {
        if let Some(journal) = &self.journal {
            if let Err(err) = journal.record(entry) {
                warn!(%err, "failed to write journal entry");
            }
        }
    }
}
