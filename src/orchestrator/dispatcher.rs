//! External agent invocation.
//!
//! The agent is an opaque executable: it receives one composed prompt
//! argument plus an auto-approval flag, runs in the workspace root, and
//! reports back only through its exit code. This module never inspects the
//! agent's output beyond a truncated excerpt for the logs; the agent alone
//! is responsible for moving and creating workspace files.
//!
//! Each call is bounded by a hard wall-clock timeout. On expiry the whole
//! process group is killed and reaped before the call returns. Dropping an
//! in-flight dispatch (orchestrator cancellation) kills the group as well,
//! so no agent process outlives its dispatch.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::AgentConfig;
use crate::models::dispatch::{DispatchOutcome, DispatchRequest, DispatchResult};
use crate::util::truncate_text;

/// Fixed instructions placed in front of every dispatch body.
const SYSTEM_PREAMBLE: &str = "You are an AI Employee assistant working inside a task workspace. Your task is to:

1. Read all files in /Needs_Action
2. Process each item according to the rules in Company_Handbook.md
3. Create action plans in /Plans for multi-step tasks
4. Move completed items to /Done
5. Create approval requests in /Pending_Approval for sensitive actions
6. Never act on anything in /Pending_Approval until it is moved to /Approved

Be proactive but cautious. When in doubt, request approval.";

/// How long to wait for pipe readers after the agent exits.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Timeout for the `--version` availability probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of the startup availability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentAvailability {
    /// `--version` exited successfully.
    Available,
    /// The executable exists but `--version` failed or hung.
    NotWorking,
    /// The executable could not be found.
    Missing,
}

/// Seam between the orchestrator loop and the agent invocation.
pub trait AgentDispatch {
    /// Run the agent once for `request` and classify the outcome.
    ///
    /// Expected failures (nonzero exit, timeout, missing executable) are
    /// reported in the result, never as a panic or error.
    fn dispatch(&self, request: &DispatchRequest) -> impl Future<Output = DispatchResult>;
}

/// Subprocess-backed dispatcher.
#[derive(Debug, Clone)]
pub struct TaskDispatcher {
    workspace_root: PathBuf,
    agent: AgentConfig,
}

impl TaskDispatcher {
    /// Dispatcher running `agent` with `workspace_root` as its directory.
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>, agent: AgentConfig) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            agent,
        }
    }

    /// Directory the agent runs in.
    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.agent.timeout_seconds)
    }

    fn compose_prompt(body: &str) -> String {
        format!("{SYSTEM_PREAMBLE}\n\n{}\n", body.trim_end())
    }

    fn build_command(&self, prompt: &str) -> Command {
        let mut cmd = Command::new(&self.agent.cli);
        if !self.agent.prompt_flag.is_empty() {
            cmd.arg(&self.agent.prompt_flag);
        }
        cmd.arg(prompt);
        if !self.agent.auto_approve_flag.is_empty() {
            cmd.arg(&self.agent.auto_approve_flag);
        }
        cmd.args(&self.agent.extra_args)
            .current_dir(&self.workspace_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so a timeout can take down helpers the agent spawned.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }

    /// Check whether the agent executable answers `--version`.
    pub async fn probe(&self) -> AgentAvailability {
        let mut cmd = Command::new(&self.agent.cli);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return AgentAvailability::Missing;
            }
            Err(err) => {
                debug!(%err, "agent probe failed to start");
                return AgentAvailability::NotWorking;
            }
        };

        match tokio::time::timeout(PROBE_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) if status.success() => AgentAvailability::Available,
            Ok(_) => AgentAvailability::NotWorking,
            Err(_) => {
                let _ = child.kill().await;
                AgentAvailability::NotWorking
            }
        }
    }

    async fn run(&self, request: &DispatchRequest) -> DispatchResult {
        let started = Instant::now();
        let prompt = Self::compose_prompt(&request.body);
        let excerpt_len = self.agent.excerpt_len;

        info!(timeout_secs = self.agent.timeout_seconds, "invoking agent");

        let mut child = match self.build_command(&prompt).spawn() {
            Ok(child) => child,
            Err(err) => {
                let outcome = if err.kind() == std::io::ErrorKind::NotFound {
                    error!(%err, "agent executable not found, is it installed?");
                    DispatchOutcome::NotFound
                } else {
                    error!(%err, "failed to start agent");
                    DispatchOutcome::SpawnFailed
                };
                return DispatchResult {
                    stderr_excerpt: truncate_text(&err.to_string(), excerpt_len),
                    ..DispatchResult::bare(outcome, started.elapsed())
                };
            }
        };

        let mut group = GroupGuard::new(&child);
        let capture = excerpt_len.saturating_add(4);
        let stdout = child.stdout.take().map(|s| tokio::spawn(read_capped(s, capture)));
        let stderr = child.stderr.take().map(|s| tokio::spawn(read_capped(s, capture)));

        let outcome = match tokio::time::timeout(self.timeout(), child.wait()).await {
            Ok(Ok(status)) if status.success() => DispatchOutcome::Succeeded,
            Ok(Ok(status)) => DispatchOutcome::Failed {
                exit_code: status.code(),
            },
            Ok(Err(err)) => {
                error!(%err, "failed to wait for agent");
                terminate(&mut child).await;
                DispatchOutcome::SpawnFailed
            }
            Err(_) => {
                error!(
                    timeout_secs = self.agent.timeout_seconds,
                    "agent timed out, killing process group"
                );
                terminate(&mut child).await;
                DispatchOutcome::TimedOut
            }
        };
        group.disarm();

        let result = DispatchResult {
            outcome,
            stdout_excerpt: truncate_text(&collect(stdout).await, excerpt_len),
            stderr_excerpt: truncate_text(&collect(stderr).await, excerpt_len),
            elapsed: started.elapsed(),
        };

        if !result.stdout_excerpt.is_empty() {
            info!(output = %result.stdout_excerpt, "agent stdout");
        }
        if !result.stderr_excerpt.is_empty() {
            warn!(output = %result.stderr_excerpt, "agent stderr");
        }
        match result.outcome {
            DispatchOutcome::Succeeded => {
                info!(elapsed = ?result.elapsed, "agent completed");
            }
            other => warn!(outcome = %other, "agent dispatch failed"),
        }

        result
    }
}

impl AgentDispatch for TaskDispatcher {
    fn dispatch(&self, request: &DispatchRequest) -> impl Future<Output = DispatchResult> {
        let span = info_span!("dispatch", agent = %self.agent.cli);
        self.run(request).instrument(span)
    }
}

/// Kills the agent's process group when a dispatch is dropped before the
/// agent exited. `kill_on_drop` alone only reaches the direct child.
struct GroupGuard {
    pgid: Option<i32>,
}

impl GroupGuard {
    fn new(child: &Child) -> Self {
        Self {
            pgid: child.id().and_then(|pid| i32::try_from(pid).ok()),
        }
    }

    /// The agent was waited for; its group id may be reused from here on.
    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;
            warn!(pgid, "dispatch abandoned, killing agent process group");
            if let Err(err) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                debug!(%err, "agent process group already gone");
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

/// Kill the agent's process group (unix) and the child itself, then reap it.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        if let Err(err) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            debug!(%err, "killpg failed, falling back to direct kill");
        }
    }
    if let Err(err) = child.kill().await {
        debug!(%err, "agent already exited");
    }
}

/// Read a pipe to EOF, keeping at most `cap` bytes.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, cap: usize) -> String {
    let mut kept = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = cap.saturating_sub(kept.len());
                kept.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
    String::from_utf8_lossy(&kept).into_owned()
}

async fn collect(handle: Option<JoinHandle<String>>) -> String {
    let Some(mut handle) = handle else {
        return String::new();
    };
    match tokio::time::timeout(PIPE_DRAIN_GRACE, &mut handle).await {
        Ok(Ok(text)) => text,
        Ok(Err(_)) => String::new(),
        Err(_) => {
            handle.abort();
            String::new()
        }
    }
}
