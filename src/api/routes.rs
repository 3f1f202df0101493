// src/api/routes.rs
use actix_web::web;
use super::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_check))
            .service(
                web::scope("/autotune")
                    .route("/start", web::post().to(handlers::start_job))
                    .route("/stop", web::post().to(handlers::stop_job))
                    .route("/status", web::get().to(handlers::get_status))
                    .route("/history", web::get().to(handlers::get_history))
            )
            .service(
                web::scope("/experiments")
                    .route("/run", web::post().to(handlers::run_experiment))
            )
    );
}
