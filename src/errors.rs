// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutotuneError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Unexpected response structure: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Auto-improver already running")]
    AlreadyRunning,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Experiment submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Experiment execution failed: {0}")]
    ExecutorHardFailure(String),

    #[error("Scoring model unavailable: {0}")]
    ScoringUnavailable(String),

    #[error("Trial driver fault: {0}")]
    InternalDriverFault(String),
}

pub type Result<T> = std::result::Result<T, AutotuneError>;
