// src/api/handlers/health.rs
use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::api::AppState;
use crate::config::ExecutorConfig;

pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    let (executor, trial_timeout) = match &state.config.executor {
        ExecutorConfig::Local => ("local", state.config.sandbox.timeout),
        ExecutorConfig::Remote { timeout, .. } => ("remote", *timeout),
    };
    Ok(HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "autotune",
        "version": env!("CARGO_PKG_VERSION"),
        "executor": executor,
        "trial_timeout_secs": trial_timeout.as_secs_f64(),
        "scorer_url": state.config.scorer.url
    })))
}
