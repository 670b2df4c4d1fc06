//! Orchestration: the agent dispatcher and the cycle that drives it.
//!
//! The orchestrator never edits action files itself. It refreshes the
//! dashboard, hands pending work to the external agent, and reports
//! approved items; moving files between folders is the agent's job.

pub mod cycle;
pub mod dispatcher;

pub use cycle::{CycleReport, Orchestrator};
pub use dispatcher::{AgentAvailability, AgentDispatch, TaskDispatcher};
