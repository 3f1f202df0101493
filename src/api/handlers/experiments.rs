// src/api/handlers/experiments.rs
use actix_web::{web, HttpResponse, Result};
use serde::Serialize;
use serde_json::json;

use crate::api::AppState;
use crate::executor::{ExecutionRequest, ExecutionResult, TrialExecutor};

#[derive(Serialize)]
pub struct ExperimentResponse {
    pub status: String,
    pub experiment_id: String,
    pub timestamp: String,
    pub description: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<ExecutionResult> for ExperimentResponse {
    fn from(result: ExecutionResult) -> Self {
        Self {
            status: result.status.to_string(),
            experiment_id: result.id,
            timestamp: result.timestamp,
            description: result.description,
            exit_code: result.exit_code,
            stdout: result.stdout,
            stderr: result.stderr,
        }
    }
}

/// POST /api/v1/experiments/run - Execute code in the local sandbox
pub async fn run_experiment(
    state: web::Data<AppState>,
    req: web::Json<ExecutionRequest>,
) -> Result<HttpResponse> {
    let request = req.into_inner();
    match state.sandbox.execute(&request).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ExperimentResponse::from(result))),
        Err(e) => {
            log::error!("Experiment '{}' failed to run: {}", request.description, e);
            Ok(HttpResponse::InternalServerError().json(json!({ "detail": e.to_string() })))
        }
    }
}
