//! Lifecycle states and the probe/maintenance seams.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("storage unavailable: {0}")]
    Storage(#[from] StoreError),

    #[error("maintenance step failed: {0}")]
    Maintenance(String),
}

/// Where the program currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Fresh install, nothing persisted yet.
    FirstRun,
    /// Importing pre-schema legacy data.
    Migrating,
    /// Applying a version upgrade to persisted data.
    Upgrading,
    /// Backfilling the poster image cache.
    Caching,
    /// Startup finished, poll loop not running.
    Ready,
    Running,
    Stopped,
}

/// Condition flags gathered before startup.
///
/// `legacy_data` and `outdated_version` are mutually exclusive steps:
/// legacy migration takes precedence and itself brings data to the current
/// version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramState {
    /// No persisted data at all; startup stops after initial setup.
    pub first_run: bool,
    /// Pre-schema data awaiting migration.
    pub legacy_data: bool,
    /// Persisted data written by an older version.
    pub outdated_version: bool,
    /// Poster image cache needs backfilling.
    pub missing_image_cache: bool,
}

/// Inspects the environment before startup.
///
/// Probing only fails when storage itself cannot be reached; every flag in
/// the returned state is a plain condition, not an error.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn probe(&self) -> Result<ProgramState, StoreError>;
}

/// One-shot maintenance steps the startup sequence may run.
#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Create the persistent store on a fresh install.
    async fn initialize_store(&self) -> Result<(), LifecycleError>;

    /// Import legacy data into the current schema.
    async fn migrate_legacy(&self) -> Result<(), LifecycleError>;

    /// Upgrade persisted data written by an older version.
    async fn upgrade_version(&self) -> Result<(), LifecycleError>;

    /// Backfill the poster image cache.
    async fn backfill_image_cache(&self) -> Result<(), LifecycleError>;
}

/// Snapshot of the orchestrator for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub state: LifecycleState,
    pub running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_state_default_is_clean() {
        let state = ProgramState::default();
        assert!(!state.first_run);
        assert!(!state.legacy_data);
        assert!(!state.outdated_version);
        assert!(!state.missing_image_cache);
    }

    #[test]
    fn test_lifecycle_state_serializes_snake_case() {
        let json = serde_json::to_string(&LifecycleState::FirstRun).unwrap();
        assert_eq!(json, "\"first_run\"");
    }
}
