//! Probe and maintenance stand-ins for lifecycle tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::program::{LifecycleError, Maintenance, ProgramState, StatusProbe};
use crate::store::StoreError;

/// A probe returning a fixed state, or failing outright.
pub struct StaticProbe {
    state: ProgramState,
    fail: bool,
}

impl StaticProbe {
    pub fn new(state: ProgramState) -> Self {
        Self { state, fail: false }
    }

    /// A probe whose storage cannot be reached.
    pub fn unavailable() -> Self {
        Self {
            state: ProgramState::default(),
            fail: true,
        }
    }
}

#[async_trait]
impl StatusProbe for StaticProbe {
    async fn probe(&self) -> Result<ProgramState, StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("scripted failure".to_string()));
        }
        Ok(self.state)
    }
}

/// Records which maintenance steps ran, optionally failing one of them.
pub struct RecordingMaintenance {
    ran: Arc<RwLock<Vec<String>>>,
    fail_step: Option<String>,
}

impl Default for RecordingMaintenance {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingMaintenance {
    pub fn new() -> Self {
        Self {
            ran: Arc::new(RwLock::new(Vec::new())),
            fail_step: None,
        }
    }

    /// A maintenance set where the named step fails.
    pub fn failing(step: &str) -> Self {
        Self {
            ran: Arc::new(RwLock::new(Vec::new())),
            fail_step: Some(step.to_string()),
        }
    }

    /// Steps that ran, in order.
    pub async fn ran(&self) -> Vec<String> {
        self.ran.read().await.clone()
    }

    async fn record(&self, step: &str) -> Result<(), LifecycleError> {
        if self.fail_step.as_deref() == Some(step) {
            return Err(LifecycleError::Maintenance(format!(
                "scripted failure in {}",
                step
            )));
        }
        self.ran.write().await.push(step.to_string());
        Ok(())
    }
}

#[async_trait]
impl Maintenance for RecordingMaintenance {
    async fn initialize_store(&self) -> Result<(), LifecycleError> {
        self.record("initialize_store").await
    }

    async fn migrate_legacy(&self) -> Result<(), LifecycleError> {
        self.record("migrate_legacy").await
    }

    async fn upgrade_version(&self) -> Result<(), LifecycleError> {
        self.record("upgrade_version").await
    }

    async fn backfill_image_cache(&self) -> Result<(), LifecycleError> {
        self.record("backfill_image_cache").await
    }
}
