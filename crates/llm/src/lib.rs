//! Generative-text capability for the multiquery workspace.
//!
//! A provider-agnostic `LlmClient` trait plus Gemini and Ollama
//! implementations. Both the query expander and the answer generator talk
//! to the model through this one interface.
//!
//! # Example
//! ```no_run
//! use multiquery_llm::{ChatMessage, LlmClient, LlmRequest, OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new(vec![ChatMessage::user("Hello, world!")], "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{ChatMessage, ChatRole, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{GeminiClient, OllamaClient};
pub use types::ProviderType;
