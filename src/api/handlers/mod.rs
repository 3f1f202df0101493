// src/api/handlers/mod.rs
mod autotune;
mod experiments;
mod health;

pub use autotune::{get_history, get_status, start_job, stop_job};
pub use experiments::run_experiment;
pub use health::health_check;
