pub mod gemini;
pub mod ollama;

pub use gemini::GeminiEmbedder;
pub use ollama::OllamaEmbedder;
