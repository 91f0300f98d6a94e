//! Program lifecycle: startup sequencing, the poll loop, and composition.
//!
//! Startup runs a fixed-priority sequence of one-shot maintenance steps
//! before the poll loop begins; the probe and maintenance seams keep the
//! environment-specific parts out of the orchestrator itself.

mod context;
mod orchestrator;
mod types;

pub use context::Context;
pub use orchestrator::LifecycleOrchestrator;
pub use types::{
    LifecycleError, LifecycleState, Maintenance, OrchestratorStatus, ProgramState, StatusProbe,
};
