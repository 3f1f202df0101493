// src/driver.rs
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::controller::StartRequest;
use crate::errors::AutotuneError;
use crate::executor::{ExecutionRequest, ExecutionStatus, TrialExecutor};
use crate::metric::extract_metric;
use crate::models::{Job, TrialRecord};
use crate::scorer::FallbackScorer;

/// Background loop for one running job. Walks iterations x parameter values in
/// order, one trial at a time.
///
/// The cancellation token is only looked at between trials and during the
/// pause after each one; a trial already handed to the executor always runs
/// to completion or to the executor's own timeout.
pub struct TrialDriver {
    pub job_id: String,
    pub request: StartRequest,
    pub job: Arc<RwLock<Job>>,
    pub executor: Arc<dyn TrialExecutor>,
    pub scorer: FallbackScorer,
    pub cancel: CancellationToken,
}

impl TrialDriver {
    pub async fn run(self) {
        let started = Instant::now();
        let mut trials = 0usize;

        log::info!(
            "Job {} started: {} iteration(s) over {} value(s) of '{}'",
            self.job_id,
            self.request.iterations,
            self.request.param_values.len(),
            self.request.param_name
        );

        'rounds: for iteration in 1..=self.request.iterations {
            if self.cancel.is_cancelled() {
                break;
            }
            for &value in &self.request.param_values {
                if self.cancel.is_cancelled() {
                    break 'rounds;
                }

                let record = self.run_trial(iteration, value).await;
                trials += 1;
                {
                    let mut job = self.job.write().await;
                    job.record(record);
                }

                self.pause().await;
            }
        }

        let mut job = self.job.write().await;
        log::info!(
            "Job {} finished after {} trial(s) in {}ms (cancelled: {}, best: {:?} -> {})",
            self.job_id,
            trials,
            started.elapsed().as_millis(),
            self.cancel.is_cancelled(),
            job.best.param,
            job.best.metric
        );
        job.finish();
    }

    async fn run_trial(&self, iteration: u32, value: f64) -> TrialRecord {
        let code = self.request.render(value);
        let request = ExecutionRequest {
            description: format!("autoimprove_job={} iter={} try={}", self.job_id, iteration, value),
            code,
        };

        let result = match self.executor.execute(&request).await {
            Ok(result) => result,
            Err(e) => {
                let err = match e {
                    hard @ AutotuneError::ExecutorHardFailure(_) => hard,
                    other => AutotuneError::SubmissionFailed(other.to_string()),
                };
                log::warn!(
                    "Job {} iter {} {}={}: {}",
                    self.job_id,
                    iteration,
                    self.request.param_name,
                    value,
                    err
                );
                return TrialRecord::failed(iteration, value, err.to_string());
            }
        };

        if result.status == ExecutionStatus::TimedOut {
            log::warn!("Job {} iter {} try {} timed out", self.job_id, iteration, value);
        }

        let metric = match extract_metric(&result.stdout) {
            Some(metric) => metric,
            None => {
                let trimmed = result.stdout.trim();
                let text = if trimmed.is_empty() { request.code.as_str() } else { trimmed };
                log::debug!("No METRIC marker in trial output; falling back to scoring model");
                self.scorer.score(text).await
            }
        };

        log::info!(
            "Job {} iter {} {}={} -> {}",
            self.job_id,
            iteration,
            self.request.param_name,
            value,
            metric
        );

        TrialRecord {
            iteration,
            param: value,
            metric: Some(metric),
            stdout: Some(result.stdout),
            stderr: Some(result.stderr),
            error: None,
        }
    }

    async fn pause(&self) {
        let delay = self.request.delay();
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
