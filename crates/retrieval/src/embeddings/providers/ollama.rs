//! Ollama embedding provider.
//!
//! Calls the local `/api/embeddings` endpoint, one text per request.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use multiquery_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Default embedding model
pub const DEFAULT_OLLAMA_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Ollama embedding provider using the local API
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaEmbedder {
    /// Create a provider against `endpoint`, or the default local URL.
    pub fn new(endpoint: Option<&str>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::Embedding(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: endpoint
                .unwrap_or(DEFAULT_OLLAMA_URL)
                .trim_end_matches('/')
                .to_string(),
            model: DEFAULT_OLLAMA_EMBEDDING_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), provider = "ollama", model = %self.model))]
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to Ollama: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);

            return Err(AppError::Embedding(format!(
                "Ollama API error ({}): {}",
                status, message
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        if body.embedding.is_empty() {
            return Err(AppError::Embedding(format!(
                "Ollama model '{}' returned an empty embedding",
                self.model
            )));
        }

        debug!("Generated {} dimensional embedding", body.embedding.len());

        Ok(body.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_is_normalized() {
        let embedder = OllamaEmbedder::new(Some("http://gpu-box:11434/")).unwrap();
        assert_eq!(embedder.base_url, "http://gpu-box:11434");
        assert_eq!(embedder.model_name(), DEFAULT_OLLAMA_EMBEDDING_MODEL);
    }

    #[test]
    fn test_request_format() {
        let body = serde_json::to_value(EmbeddingRequest {
            model: "nomic-embed-text",
            prompt: "hello",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"model": "nomic-embed-text", "prompt": "hello"})
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_embedding_error() {
        let embedder = OllamaEmbedder::new(Some("http://127.0.0.1:1")).unwrap();
        let result = embedder.embed("hello").await;
        assert!(matches!(result, Err(AppError::Embedding(_))));
    }
}
