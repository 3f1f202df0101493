// src/executor/mod.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub mod remote;
pub mod sandbox;

pub use remote::RemoteExecutor;
pub use sandbox::SandboxExecutor;

/// One unit of work submitted for execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Free text carried through for traceability only.
    pub description: String,
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    TimedOut,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Outcome of a single execution, as returned by an executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(alias = "experiment_id")]
    pub id: String,
    pub timestamp: String,
    #[serde(default)]
    pub description: String,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

/// Anything that can run a trial's code and hand back its captured output.
///
/// `Err` means the work could not be submitted or could not start at all; a
/// trial that ran and failed or timed out is still `Ok`.
#[async_trait]
pub trait TrialExecutor: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult>;
}

/// Short identifier for executions and jobs.
pub fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
