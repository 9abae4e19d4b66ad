//! Query embeddings for vector search.

pub mod provider;
pub mod providers;

pub use provider::{create_embedder, EmbeddingProvider};
pub use providers::{GeminiEmbedder, OllamaEmbedder};
