//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// Dedup ledger could not be persisted.
    State(String),
    /// Dashboard document could not be read or written.
    Dashboard(String),
    /// A watcher failed to detect or materialize an item.
    Watcher(String),
    /// Workflow journal write failure.
    Journal(String),
    /// Requested path or entity does not exist.
    NotFound(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::State(msg) => write!(f, "state: {msg}"),
            Self::Dashboard(msg) => write!(f, "dashboard: {msg}"),
            Self::Watcher(msg) => write!(f, "watcher: {msg}"),
            Self::Journal(msg) => write!(f, "journal: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
