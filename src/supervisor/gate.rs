use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};

// @module: Access gate collaborator (authorization and usage accounting)

/// Opaque caller identity handed to the gate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity used by the command line, which has no accounts
    pub fn local() -> Self {
        Self::new("local")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decides who may run a job and accounts for completed ones
#[async_trait]
pub trait AccessGate: Send + Sync {
    /// Whether `caller` may start a job now
    async fn authorize(&self, caller: &CallerIdentity) -> Result<bool>;

    /// Called once per Completed job
    async fn record_usage(&self, caller: &CallerIdentity) -> Result<()>;
}

/// Gate that admits everyone and counts nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

#[async_trait]
impl AccessGate for AllowAll {
    async fn authorize(&self, _caller: &CallerIdentity) -> Result<bool> {
        Ok(true)
    }

    async fn record_usage(&self, _caller: &CallerIdentity) -> Result<()> {
        Ok(())
    }
}

// @spawns: Detached usage notification; its failure never reaches the job
pub(crate) fn notify_usage(gate: Arc<dyn AccessGate>, caller: CallerIdentity, job: String) {
    tokio::spawn(async move {
        match gate.record_usage(&caller).await {
            Ok(()) => debug!("Recorded usage for {} (job {})", caller, job),
            Err(e) => warn!("Failed to record usage for {} (job {}): {}", caller, job, e),
        }
    });
}
