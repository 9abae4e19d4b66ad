//! Gemini embedding provider.
//!
//! Gemini API: `POST /v1beta/models/{model}:embedContent`

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use multiquery_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Default embedding model
pub const DEFAULT_GEMINI_EMBEDDING_MODEL: &str = "text-embedding-004";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Gemini embedding provider
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

// Keep the key out of debug output.
impl std::fmt::Debug for GeminiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiEmbedder")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    /// Create a provider against `endpoint`, or the public API.
    pub fn new(endpoint: Option<&str>, api_key: impl Into<String>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::Embedding(format!("Failed to create HTTP client for Gemini: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: endpoint
                .unwrap_or(DEFAULT_GEMINI_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_EMBEDDING_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint_url(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{}/v1beta/models/{}:embedContent", self.base_url, model)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), provider = "gemini", model = %self.model))]
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = self.endpoint_url();
        let body = EmbedContentRequest {
            content: Content {
                parts: [Part { text }],
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to Gemini: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Embedding(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Gemini response: {}", e)))?;

        debug!("Generated {} dimensional embedding", body.embedding.values.len());

        Ok(body.embedding.values)
    }
}
