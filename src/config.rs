//! Global configuration parsing and validation.
//!
//! Every key is optional. A workspace without `taskvault.toml` runs on
//! the defaults below.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// File name looked up in the workspace root when `--config` is not given.
pub const CONFIG_FILENAME: &str = "taskvault.toml";

/// External agent invocation settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct AgentConfig {
    /// Agent executable (resolved through `PATH`).
    pub cli: String,
    /// Flag preceding the composed prompt argument.
    pub prompt_flag: String,
    /// Flag that lets the agent run tools without interactive approval.
    pub auto_approve_flag: String,
    /// Extra arguments appended after the auto-approval flag.
    pub extra_args: Vec<String>,
    /// Hard wall-clock limit for a single invocation.
    pub timeout_seconds: u64,
    /// Maximum bytes of stdout/stderr kept for logging.
    pub excerpt_len: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cli: "qwen".into(),
            prompt_flag: "-p".into(),
            auto_approve_flag: "-y".into(),
            extra_args: Vec::new(),
            timeout_seconds: 300,
            excerpt_len: 500,
        }
    }
}

/// Watcher process settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct WatcherConfig {
    /// Seconds between periodic drop-folder scans.
    pub interval_seconds: u64,
    /// Drop folder override; defaults to `<workspace>/Drop`.
    pub drop_folder: Option<PathBuf>,
    /// Subscribe to filesystem notifications as an early wake-up.
    pub notify: bool,
    /// Delay after a notification before scanning, so writers can finish.
    pub settle_millis: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 30,
            drop_folder: None,
            notify: true,
            settle_millis: 500,
        }
    }
}

/// Global configuration parsed from `taskvault.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct GlobalConfig {
    /// Seconds between orchestrator cycles.
    pub check_interval_seconds: u64,
    /// Pause after a failed orchestrator cycle.
    pub error_backoff_seconds: u64,
    /// Cap of the persisted dedup ledger.
    pub max_processed_ids: usize,
    /// Agent invocation settings.
    pub agent: AgentConfig,
    /// Watcher settings.
    pub watcher: WatcherConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: 60,
            error_backoff_seconds: 10,
            max_processed_ids: 1000,
            agent: AgentConfig::default(),
            watcher: WatcherConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            AppError::Config(format!("failed to read config {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration for a workspace.
    ///
    /// An explicit path must exist. Without one, `<workspace>/taskvault.toml`
    /// is used when present and the defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the chosen file is unreadable or invalid.
    pub fn resolve(explicit: Option<&Path>, workspace_root: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }
        let candidate = workspace_root.join(CONFIG_FILENAME);
        if candidate.is_file() {
            Self::load_from_path(candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Interval between orchestrator cycles.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    /// Backoff after a failed orchestrator cycle.
    #[must_use]
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_seconds)
    }

    /// Agent invocation timeout.
    #[must_use]
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent.timeout_seconds)
    }

    /// Interval between watcher scans.
    #[must_use]
    pub fn watcher_interval(&self) -> Duration {
        Duration::from_secs(self.watcher.interval_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.check_interval_seconds == 0 {
            return Err(AppError::Config(
                "check_interval_seconds must be greater than zero".into(),
            ));
        }
        if self.error_backoff_seconds == 0 {
            return Err(AppError::Config(
                "error_backoff_seconds must be greater than zero".into(),
            ));
        }
        if self.watcher.interval_seconds == 0 {
            return Err(AppError::Config(
                "watcher.interval_seconds must be greater than zero".into(),
            ));
        }
        if self.max_processed_ids == 0 {
            return Err(AppError::Config(
                "max_processed_ids must be greater than zero".into(),
            ));
        }
        if self.agent.timeout_seconds == 0 {
            return Err(AppError::Config(
                "agent.timeout_seconds must be greater than zero".into(),
            ));
        }
        if self.agent.cli.trim().is_empty() {
            return Err(AppError::Config("agent.cli must not be empty".into()));
        }
        Ok(())
    }
}
