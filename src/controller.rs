// src/controller.rs
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::driver::TrialDriver;
use crate::errors::{AutotuneError, Result};
use crate::executor::{short_id, TrialExecutor};
use crate::models::{BestTrial, HistoryEntry, Job, JobStatus};
use crate::scorer::FallbackScorer;

/// Substitution token replaced by each parameter value.
pub const PARAM_TOKEN: &str = "{param}";

/// Most recent entries returned by [`JobController::history`].
pub const HISTORY_LIMIT: usize = 200;

fn default_param_name() -> String {
    "param".to_string()
}

fn default_iterations() -> u32 {
    5
}

fn default_delay() -> f64 {
    0.5
}

/// Parameters of a grid-search job.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StartRequest {
    /// Code with exactly one `{param}` token.
    pub code_template: String,
    /// Informational only; used in logs.
    #[serde(default = "default_param_name")]
    pub param_name: String,
    pub param_values: Vec<f64>,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Seconds to wait after each trial.
    #[serde(default = "default_delay")]
    pub delay_between_rounds: f64,
}

impl StartRequest {
    pub fn validate(&self) -> Result<()> {
        let tokens = self.code_template.matches(PARAM_TOKEN).count();
        if tokens != 1 {
            return Err(AutotuneError::InvalidRequest(format!(
                "code_template must contain {} exactly once (found {})",
                PARAM_TOKEN, tokens
            )));
        }
        if self.param_values.is_empty() {
            return Err(AutotuneError::InvalidRequest("param_values must not be empty".to_string()));
        }
        if self.param_values.iter().any(|v| !v.is_finite()) {
            return Err(AutotuneError::InvalidRequest("param_values must be finite numbers".to_string()));
        }
        if self.iterations < 1 {
            return Err(AutotuneError::InvalidRequest("iterations must be at least 1".to_string()));
        }
        if Duration::try_from_secs_f64(self.delay_between_rounds).is_err() {
            return Err(AutotuneError::InvalidRequest(
                "delay_between_rounds must be a non-negative number of seconds".to_string(),
            ));
        }
        Ok(())
    }

    /// Trial code for one parameter value.
    pub fn render(&self, value: f64) -> String {
        self.code_template.replace(PARAM_TOKEN, &value.to_string())
    }

    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_between_rounds).unwrap_or(Duration::ZERO)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    Stopping,
    NotRunning,
}

#[derive(Serialize, Debug, Clone)]
pub struct StatusSnapshot {
    pub running: bool,
    pub job_id: Option<String>,
    pub best: BestTrial,
    pub history_length: usize,
}

/// Owns the single search job and the executor/scorer it runs against.
///
/// Every read and write of the job goes through one `RwLock`, so callers never
/// see a history entry without its matching best update.
#[derive(Clone)]
pub struct JobController {
    job: Arc<RwLock<Job>>,
    executor: Arc<dyn TrialExecutor>,
    scorer: FallbackScorer,
}

impl JobController {
    pub fn new(executor: Arc<dyn TrialExecutor>, scorer: FallbackScorer) -> Self {
        Self { job: Arc::new(RwLock::new(Job::default())), executor, scorer }
    }

    /// Admit a new job and launch its driver in the background. Returns the
    /// job id without waiting for any trial.
    pub async fn start(&self, request: StartRequest) -> Result<String> {
        request.validate()?;

        let job_id = short_id();
        let cancel = CancellationToken::new();
        {
            let mut job = self.job.write().await;
            if job.is_running() {
                return Err(AutotuneError::AlreadyRunning);
            }
            job.status = JobStatus::Running;
            job.id = Some(job_id.clone());
            job.history.clear();
            job.best = BestTrial::default();
            job.cancel = Some(cancel.clone());
        }

        let driver = TrialDriver {
            job_id: job_id.clone(),
            request,
            job: self.job.clone(),
            executor: self.executor.clone(),
            scorer: self.scorer.clone(),
            cancel,
        };
        let handle = tokio::spawn(driver.run());

        let job = self.job.clone();
        let supervised_id = job_id.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                let fault = AutotuneError::InternalDriverFault(e.to_string());
                log::error!("Job {} aborted: {}", supervised_id, fault);
                let mut job = job.write().await;
                job.record_fault(fault.to_string());
                job.finish();
            }
        });

        Ok(job_id)
    }

    /// Ask the running job to stop after its current trial. Does not wait.
    pub async fn stop(&self) -> StopOutcome {
        let job = self.job.read().await;
        match (&job.cancel, job.is_running()) {
            (Some(cancel), true) => {
                cancel.cancel();
                log::info!("Stop requested for job {:?}", job.id);
                StopOutcome::Stopping
            }
            _ => StopOutcome::NotRunning,
        }
    }

    pub async fn status(&self) -> StatusSnapshot {
        let job = self.job.read().await;
        StatusSnapshot {
            running: job.is_running(),
            job_id: job.id.clone(),
            best: job.best.clone(),
            history_length: job.history.len(),
        }
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.job.read().await.recent_history(HISTORY_LIMIT)
    }
}
