#![forbid(unsafe_code)]

//! Folder-based task workflow engine.
//!
//! Work flows through a fixed set of workspace folders. Watchers turn
//! external events into markdown action files, the orchestrator hands
//! pending action files to an external agent, and a markdown dashboard
//! summarizes queue depths.

pub mod config;
pub mod dashboard;
pub mod errors;
pub mod journal;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod queue;
pub mod shutdown;
pub mod state;
pub mod util;
pub mod watcher;
pub mod workspace;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
