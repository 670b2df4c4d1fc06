//! Agent dispatch request and classified outcome.

use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Work handed to the agent in one invocation.
///
/// Only the body is caller-supplied; the dispatcher adds its own fixed
/// instructions in front of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Task-specific prompt text.
    pub body: String,
}

impl DispatchRequest {
    /// Request carrying `body`.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

/// How an agent invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Exit code zero.
    Succeeded,
    /// Nonzero exit code, or `None` when killed by a signal.
    Failed {
        /// Process exit code.
        exit_code: Option<i32>,
    },
    /// Wall-clock limit exceeded; the process was killed.
    TimedOut,
    /// Agent executable could not be found.
    NotFound,
    /// The process could not be started or awaited for another reason.
    SpawnFailed,
}

impl Display for DispatchOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed {
                exit_code: Some(code),
            } => write!(f, "exited with code {code}"),
            Self::Failed { exit_code: None } => write!(f, "terminated by signal"),
            Self::TimedOut => write!(f, "timed out"),
            Self::NotFound => write!(f, "executable not found"),
            Self::SpawnFailed => write!(f, "failed to start"),
        }
    }
}

/// Result of one agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    /// Classified outcome.
    pub outcome: DispatchOutcome,
    /// Truncated stdout.
    pub stdout_excerpt: String,
    /// Truncated stderr (or the spawn error message).
    pub stderr_excerpt: String,
    /// Wall time spent in the call.
    pub elapsed: Duration,
}

impl DispatchResult {
    /// Result with no captured output.
    #[must_use]
    pub fn bare(outcome: DispatchOutcome, elapsed: Duration) -> Self {
        Self {
            outcome,
            stdout_excerpt: String::new(),
            stderr_excerpt: String::new(),
            elapsed,
        }
    }

    /// Whether the agent exited with code zero.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome == DispatchOutcome::Succeeded
    }

    /// Whether the call hit the timeout.
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.outcome == DispatchOutcome::TimedOut
    }
}
