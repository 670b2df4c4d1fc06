//! Tracing subscriber setup shared by both binaries.
//!
//! Console output goes to stderr in text or JSON form. When a log folder is
//! given, a second plain-text layer appends to
//! `<log_dir>/<process>_YYYY-MM-DD.log`, named after the start date, through
//! a non-blocking appender.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::{AppError, Result};

/// Console log format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Daily log file path for `process` on the current local date.
#[must_use]
pub fn log_file_path(log_dir: &Path, process: &str) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d");
    log_dir.join(format!("{process}_{date}.log"))
}

/// File appender writing to `path` for the life of the process.
fn file_appender(path: &Path) -> std::result::Result<RollingFileAppender, String> {
    let dir = path.parent().ok_or("log path has no parent")?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or("log path has no file name")?;
    std::fs::create_dir_all(dir).map_err(|err| err.to_string())?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(|err| err.to_string())
}

/// Install the global subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. A log file that
/// cannot be opened leaves console logging in place and is reported once
/// the subscriber is up. The returned guard flushes the file writer when
/// dropped, so callers hold it until exit.
///
/// # Errors
///
/// Returns `AppError::Config` if a global subscriber is already installed.
pub fn init_tracing(
    format: LogFormat,
    log_dir: Option<&Path>,
    process: &str,
) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers: Vec<BoxedLayer> = vec![match format {
        LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    }];

    let mut guard = None;
    let mut file_error = None;
    if let Some(dir) = log_dir {
        let path = log_file_path(dir, process);
        match file_appender(&path) {
            Ok(appender) => {
                let (writer, worker) = tracing_appender::non_blocking(appender);
                guard = Some(worker);
                layers.push(fmt::layer().with_ansi(false).with_writer(writer).boxed());
            }
            Err(err) => file_error = Some((path, err)),
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?;

    if let Some((path, err)) = file_error {
        warn!(path = %path.display(), %err, "could not open log file, logging to console only");
    }
    Ok(guard)
}
