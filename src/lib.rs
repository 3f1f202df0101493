// src/lib.rs
pub mod api;
pub mod banner;
pub mod config;
pub mod controller;
pub mod driver;
pub mod errors;
pub mod executor;
pub mod metric;
pub mod models;
pub mod scorer;
