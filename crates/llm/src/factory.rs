//! LLM provider factory.
//!
//! Resolves a provider name to a shared client handle. The handle is built
//! once per process and reused by every pipeline run.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OllamaClient};
use crate::types::ProviderType;
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("gemini", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required by Gemini)
///
/// # Errors
/// Returns an error if the provider is unknown or a required key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    match provider_type {
        ProviderType::Ollama => {
            let client = match endpoint {
                Some(base_url) => OllamaClient::with_base_url(base_url),
                None => OllamaClient::new(),
            };
            Ok(Arc::new(client))
        }
        ProviderType::Gemini => {
            let api_key = api_key.ok_or_else(|| "Gemini provider requires API key".to_string())?;
            let client = match endpoint {
                Some(base_url) => GeminiClient::with_base_url(base_url, api_key),
                None => GeminiClient::new(api_key),
            };
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_gemini_client() {
        let client = create_client("gemini", None, Some("key")).unwrap();
        assert_eq!(client.provider_name(), "gemini");
    }

    #[test]
    fn test_gemini_requires_api_key() {
        match create_client("gemini", None, None) {
            Err(err) => assert!(err.contains("Gemini provider requires API key")),
            Ok(_) => panic!("Expected error for Gemini without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None) {
            Err(err) => assert!(err.contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
