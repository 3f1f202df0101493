// src/config.rs
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{AutotuneError, Result};

pub const DEFAULT_SCORER_URL: &str = "http://localhost:8050/predict";

/// Settings for the in-process sandbox executor.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Directory under which each trial gets its own scratch directory.
    pub root: PathBuf,
    pub interpreter: String,
    /// File extension of the written trial script, without the dot.
    pub extension: String,
    pub timeout: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir().join("autotune-sandbox"),
            interpreter: "python3".to_string(),
            extension: "py".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Where trials are sent for execution.
#[derive(Debug, Clone)]
pub enum ExecutorConfig {
    /// Run trials in the local sandbox.
    Local,
    /// Forward trials to an executor service over HTTP.
    Remote { url: String, timeout: Duration },
}

/// Configuration for the fallback scoring model.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub url: String,
    pub timeout: Duration,
}

/// High-level application configuration loaded from an optional TOML file and
/// environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub executor: ExecutorConfig,
    pub scorer: ScorerConfig,
    pub sandbox: SandboxConfig,
}

/// On-disk layout of `AUTOTUNE_CONFIG`. Every key is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub executor_url: Option<String>,
    pub executor_timeout_secs: Option<u64>,
    pub scorer_url: Option<String>,
    pub scorer_timeout_secs: Option<u64>,
    pub sandbox_root: Option<PathBuf>,
    pub sandbox_interpreter: Option<String>,
    pub sandbox_extension: Option<String>,
    pub sandbox_timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn from_path(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

impl AppConfig {
    /// Load configuration from `AUTOTUNE_CONFIG` (if set) and the environment.
    /// Environment variables take precedence over the file.
    pub fn from_env() -> Result<Self> {
        let file = match std::env::var("AUTOTUNE_CONFIG") {
            Ok(path) => FileConfig::from_path(&path)?,
            Err(_) => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge file values with overrides supplied by `lookup`.
    pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SandboxConfig::default();

        let host = lookup("AUTOTUNE_HOST")
            .or(file.host)
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("AUTOTUNE_PORT") {
            Some(raw) => parse_number::<u16>("AUTOTUNE_PORT", &raw)?,
            None => file.port.unwrap_or(8090),
        };

        let executor_timeout = timeout_setting(
            "EXECUTOR_TIMEOUT_SECS",
            lookup("EXECUTOR_TIMEOUT_SECS"),
            file.executor_timeout_secs,
            15,
        )?;
        let executor = match lookup("EXECUTOR_URL").or(file.executor_url) {
            Some(url) if !url.trim().is_empty() => ExecutorConfig::Remote {
                url: url.trim().to_string(),
                timeout: executor_timeout,
            },
            _ => ExecutorConfig::Local,
        };

        let scorer = ScorerConfig {
            url: lookup("SCORER_URL")
                .or(file.scorer_url)
                .unwrap_or_else(|| DEFAULT_SCORER_URL.to_string()),
            timeout: timeout_setting(
                "SCORER_TIMEOUT_SECS",
                lookup("SCORER_TIMEOUT_SECS"),
                file.scorer_timeout_secs,
                5,
            )?,
        };

        let sandbox = SandboxConfig {
            root: lookup("SANDBOX_ROOT")
                .map(PathBuf::from)
                .or(file.sandbox_root)
                .unwrap_or(defaults.root),
            interpreter: lookup("SANDBOX_INTERPRETER")
                .or(file.sandbox_interpreter)
                .unwrap_or(defaults.interpreter),
            extension: lookup("SANDBOX_EXTENSION")
                .or(file.sandbox_extension)
                .map(|ext| ext.trim_start_matches('.').to_string())
                .unwrap_or(defaults.extension),
            timeout: timeout_setting(
                "SANDBOX_TIMEOUT_SECS",
                lookup("SANDBOX_TIMEOUT_SECS"),
                file.sandbox_timeout_secs,
                5,
            )?,
        };

        if sandbox.interpreter.trim().is_empty() {
            return Err(AutotuneError::Config(
                "SANDBOX_INTERPRETER must not be empty".to_string(),
            ));
        }

        Ok(AppConfig { host, port, executor, scorer, sandbox })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AutotuneError::Config(format!("{} is not a valid number: '{}'", key, raw)))
}

fn timeout_setting(key: &str, env: Option<String>, file: Option<u64>, default: u64) -> Result<Duration> {
    let secs = match env {
        Some(raw) => parse_number::<u64>(key, &raw)?,
        None => file.unwrap_or(default),
    };
    if secs == 0 {
        return Err(AutotuneError::Config(format!("{} must be greater than zero", key)));
    }
    Ok(Duration::from_secs(secs))
}
