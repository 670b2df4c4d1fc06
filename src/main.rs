#![forbid(unsafe_code)]

//! `taskvault`: workflow orchestrator binary.
//!
//! Prepares the workspace, probes the agent CLI, then runs orchestrator
//! cycles until SIGINT/SIGTERM (or exactly one cycle with `--once`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use taskvault::journal::JsonlJournal;
use taskvault::logging::{init_tracing, LogFormat};
use taskvault::orchestrator::{AgentAvailability, Orchestrator, TaskDispatcher};
use taskvault::shutdown::cancel_on_signal;
use taskvault::workspace::{FolderRole, Workspace};
use taskvault::{AppError, GlobalConfig, Result};

/// Workspace used when none is given and it exists in the current directory.
const DEFAULT_WORKSPACE: &str = "AI_Employee_Vault";

#[derive(Debug, Parser)]
#[command(name = "taskvault", about = "Folder-based task workflow orchestrator", version, long_about = None)]
struct Cli {
    /// Workspace root. Defaults to `./AI_Employee_Vault` when that exists.
    workspace: Option<PathBuf>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    let args = Cli::parse();

    let Some(root) = resolve_workspace(args.workspace.as_deref()) else {
        eprintln!("error: workspace not found");
        eprintln!("{}", Cli::command().render_usage());
        return ExitCode::FAILURE;
    };

    match start(&args, &root) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Explicit workspace if it is a directory, else the default if present.
fn resolve_workspace(explicit: Option<&Path>) -> Option<PathBuf> {
    let candidate = explicit.map_or_else(|| PathBuf::from(DEFAULT_WORKSPACE), Path::to_path_buf);
    candidate.is_dir().then_some(candidate)
}

fn start(args: &Cli, root: &Path) -> Result<()> {
    let workspace = Workspace::init(root)?;
    let config = GlobalConfig::resolve(args.config.as_deref(), workspace.root())?;
    let _log_guard = init_tracing(
        args.log_format,
        Some(&workspace.folder(FolderRole::Logs)),
        "orchestrator",
    )?;
    info!(workspace = %workspace.root().display(), "taskvault orchestrator bootstrap");

    let outcome = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(workspace, config, args.once)));
    if let Err(err) = &outcome {
        error!(%err, "orchestrator failed");
    }
    outcome
}

async fn run(workspace: Workspace, config: GlobalConfig, once: bool) -> Result<()> {
    let dispatcher = TaskDispatcher::new(workspace.root(), config.agent.clone());
    match dispatcher.probe().await {
        AgentAvailability::Available => info!(cli = %config.agent.cli, "agent CLI available"),
        AgentAvailability::NotWorking => {
            warn!(cli = %config.agent.cli, "agent CLI found but not working properly");
        }
        AgentAvailability::Missing => {
            warn!(cli = %config.agent.cli, "agent CLI not found, dispatches will fail");
        }
    }

    let mut orchestrator = Orchestrator::new(workspace.clone(), dispatcher, &config);
    match JsonlJournal::new(workspace.folder(FolderRole::Logs)) {
        Ok(journal) => {
            orchestrator = orchestrator.with_journal(Box::new(journal));
        }
        Err(err) => warn!(%err, "workflow journal disabled"),
    }

    if once {
        let report = orchestrator.run_once().await?;
        info!(
            dispatched = report.batch.len(),
            approved = report.approved.len(),
            "single cycle complete"
        );
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let signals = cancel_on_signal(&cancel);
    orchestrator.run(cancel.clone()).await;
    cancel.cancel();
    let _ = signals.await;

    info!("taskvault orchestrator shut down");
    Ok(())
}
