//! Embedding provider trait and factory.

use super::providers::{GeminiEmbedder, OllamaEmbedder};
use multiquery_core::{AppError, AppResult};
use std::sync::Arc;

/// Turns query text into a dense vector for similarity search.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "ollama", "gemini")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Generate the embedding for one text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}

/// Create an embedding provider by name.
///
/// `model` falls back to the provider's default embedding model.
pub fn create_embedder(
    provider: &str,
    endpoint: Option<&str>,
    model: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let mut embedder = OllamaEmbedder::new(endpoint)?;
            if let Some(model) = model {
                embedder = embedder.with_model(model);
            }
            Ok(Arc::new(embedder))
        }

        "gemini" | "google" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("Gemini embedding provider requires an API key".to_string())
            })?;
            let mut embedder = GeminiEmbedder::new(endpoint, api_key)?;
            if let Some(model) = model {
                embedder = embedder.with_model(model);
            }
            Ok(Arc::new(embedder))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: gemini, ollama",
            provider
        ))),
    }
}
