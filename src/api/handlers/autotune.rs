// src/api/handlers/autotune.rs
use actix_web::{web, HttpResponse, Result};
use serde::Serialize;
use serde_json::json;

use crate::api::AppState;
use crate::controller::{StartRequest, StopOutcome};
use crate::errors::AutotuneError;

#[derive(Serialize)]
pub struct StartResponse {
    pub status: String,
    pub job_id: String,
}

#[derive(Serialize)]
pub struct StopResponse {
    pub status: StopOutcome,
}

/// POST /api/v1/autotune/start - Launch a grid-search job
pub async fn start_job(
    state: web::Data<AppState>,
    req: web::Json<StartRequest>,
) -> Result<HttpResponse> {
    match state.controller.start(req.into_inner()).await {
        Ok(job_id) => Ok(HttpResponse::Ok().json(StartResponse {
            status: "started".to_string(),
            job_id,
        })),
        Err(e) => {
            log::warn!("Rejected auto-improve job: {}", e);
            let body = json!({ "detail": e.to_string() });
            match e {
                AutotuneError::AlreadyRunning => Ok(HttpResponse::Conflict().json(body)),
                AutotuneError::InvalidRequest(_) => Ok(HttpResponse::BadRequest().json(body)),
                _ => Ok(HttpResponse::InternalServerError().json(body)),
            }
        }
    }
}

/// POST /api/v1/autotune/stop - Request cooperative cancellation
pub async fn stop_job(state: web::Data<AppState>) -> Result<HttpResponse> {
    let status = state.controller.stop().await;
    Ok(HttpResponse::Ok().json(StopResponse { status }))
}

/// GET /api/v1/autotune/status - Running flag, job id and best trial
pub async fn get_status(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.controller.status().await))
}

/// GET /api/v1/autotune/history - Most recent trial records
pub async fn get_history(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.controller.history().await))
}
