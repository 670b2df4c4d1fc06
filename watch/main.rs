#![forbid(unsafe_code)]

//! `taskvault-watch`: drop-folder watcher binary.
//!
//! Turns files dropped into the watched folder into action files in
//! `Needs_Action`, polling on an interval and optionally waking early on
//! filesystem notifications.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use taskvault::journal::JsonlJournal;
use taskvault::logging::{init_tracing, LogFormat};
use taskvault::shutdown::cancel_on_signal;
use taskvault::state::StateStore;
use taskvault::watcher::{DropTrigger, FileDropWatcher, WatchLoop};
use taskvault::workspace::{FolderRole, Workspace};
use taskvault::{AppError, GlobalConfig, Result};

#[derive(Debug, Parser)]
#[command(name = "taskvault-watch", about = "Drop-folder watcher for a taskvault workspace", version, long_about = None)]
struct Cli {
    /// Workspace root.
    workspace: PathBuf,

    /// Folder to watch. Defaults to `<workspace>/Drop`.
    drop_folder: Option<PathBuf>,

    /// Scan once and exit.
    #[arg(long)]
    once: bool,

    /// Seconds between scans (overrides the config file).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Poll only; do not subscribe to filesystem notifications.
    #[arg(long)]
    no_notify: bool,

    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    match start(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn start(args: Cli) -> Result<()> {
    let workspace = Workspace::init(&args.workspace)?;
    let mut config = GlobalConfig::resolve(args.config.as_deref(), workspace.root())?;
    if let Some(secs) = args.interval {
        config.watcher.interval_seconds = secs;
    }
    if args.no_notify {
        config.watcher.notify = false;
    }
    let drop_folder = args
        .drop_folder
        .or_else(|| config.watcher.drop_folder.as_deref().map(|p| anchor(p, workspace.root())));

    let _log_guard = init_tracing(
        args.log_format,
        Some(&workspace.folder(FolderRole::Logs)),
        "watcher",
    )?;
    info!(workspace = %workspace.root().display(), "taskvault watcher bootstrap");

    let outcome = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(workspace, config, drop_folder, args.once)));
    if let Err(err) = &outcome {
        error!(%err, "watcher failed");
    }
    outcome
}

/// Config-file paths are relative to the workspace root.
fn anchor(path: &Path, root: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

async fn run(
    workspace: Workspace,
    config: GlobalConfig,
    drop_folder: Option<PathBuf>,
    once: bool,
) -> Result<()> {
    let watcher = FileDropWatcher::new(&workspace, drop_folder)?;
    let drop_dir = watcher.drop_folder().to_path_buf();
    info!(drop_folder = %drop_dir.display(), "watching drop folder");

    let store = StateStore::new(workspace.state_path(), config.max_processed_ids);
    let mut watch_loop = WatchLoop::new(watcher, store, config.watcher_interval())
        .with_settle_delay(Duration::from_millis(config.watcher.settle_millis));
    match JsonlJournal::new(workspace.folder(FolderRole::Logs)) {
        Ok(journal) => watch_loop = watch_loop.with_journal(Box::new(journal)),
        Err(err) => warn!(%err, "workflow journal disabled"),
    }

    if once {
        let created = watch_loop.run_cycle()?;
        info!(created = created.len(), "single scan complete");
        return Ok(());
    }

    let trigger = if config.watcher.notify {
        match DropTrigger::subscribe(&drop_dir) {
            Ok(trigger) => Some(trigger),
            Err(err) => {
                warn!(%err, "change notifications unavailable, polling only");
                None
            }
        }
    } else {
        None
    };

    let cancel = CancellationToken::new();
    let signals = cancel_on_signal(&cancel);
    watch_loop
        .run(cancel.clone(), trigger.as_ref().map(DropTrigger::wake))
        .await;
    cancel.cancel();
    let _ = signals.await;
    drop(trigger);

    info!("taskvault watcher shut down");
    Ok(())
}
