// src/api/state.rs
use crate::config::{AppConfig, ExecutorConfig};
use crate::controller::JobController;
use crate::executor::{RemoteExecutor, SandboxExecutor, TrialExecutor};
use crate::scorer::{FallbackScorer, HttpClassifier};
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub controller: JobController,
    /// Backs the `/experiments/run` endpoint regardless of where trials go.
    pub sandbox: Arc<SandboxExecutor>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let client = Client::new();
        let sandbox = Arc::new(SandboxExecutor::new(config.sandbox.clone()));

        let executor: Arc<dyn TrialExecutor> = match &config.executor {
            ExecutorConfig::Local => sandbox.clone() as Arc<dyn TrialExecutor>,
            ExecutorConfig::Remote { url, timeout } => {
                Arc::new(RemoteExecutor::new(client.clone(), url.clone(), *timeout))
            }
        };
        let classifier = Arc::new(HttpClassifier::new(client.clone(), config.scorer.clone()));
        let controller = JobController::new(executor, FallbackScorer::new(classifier));

        Self {
            config: Arc::new(config),
            controller,
            sandbox,
        }
    }

    /// State wired to caller-supplied collaborators.
    pub fn with_controller(config: AppConfig, controller: JobController) -> Self {
        let sandbox = Arc::new(SandboxExecutor::new(config.sandbox.clone()));
        Self {
            config: Arc::new(config),
            controller,
            sandbox,
        }
    }
}
