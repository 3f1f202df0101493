// src/scorer.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ScorerConfig;
use crate::errors::{AutotuneError, Result};

/// A text classification backend that returns a categorical label.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<String>;
}

/// Classifier backed by the model-serving `/predict` endpoint.
pub struct HttpClassifier {
    client: Client,
    config: ScorerConfig,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    prediction: Option<String>,
}

impl HttpClassifier {
    pub fn new(client: Client, config: ScorerConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl TextClassifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<String> {
        log::debug!("Calling scoring model at {}", self.config.url);

        let resp = self
            .client
            .post(&self.config.url)
            .timeout(self.config.timeout)
            .json(&PredictRequest { text })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            return Err(AutotuneError::ApiError { status: status.as_u16(), body });
        }

        let predicted: PredictResponse = resp.json().await?;
        predicted
            .prediction
            .ok_or_else(|| AutotuneError::UnexpectedResponse("missing 'prediction' field".to_string()))
    }
}

/// Maps a sentiment label to a numeric fitness score.
pub fn label_to_score(label: &str) -> f64 {
    match label.trim().to_lowercase().as_str() {
        "positive" => 1.0,
        "negative" => -1.0,
        _ => 0.0,
    }
}

/// Scores free text when a trial printed no explicit metric.
///
/// Never fails: an empty input or any classifier error yields the neutral
/// score `0.0`.
#[derive(Clone)]
pub struct FallbackScorer {
    classifier: Arc<dyn TextClassifier>,
}

impl FallbackScorer {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        Self { classifier }
    }

    pub async fn score(&self, text: &str) -> f64 {
        if text.is_empty() {
            return 0.0;
        }
        match self.classifier.classify(text).await {
            Ok(label) => label_to_score(&label),
            Err(e) => {
                let err = AutotuneError::ScoringUnavailable(e.to_string());
                log::warn!("{}; using neutral score", err);
                0.0
            }
        }
    }
}
