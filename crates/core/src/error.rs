//! Error types for the multiquery workspace.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! provider transport, prompt rendering, and the typed failures of the
//! retrieval pipeline. Recoverable expansion parse anomalies are not here:
//! they never leave the expander.

use thiserror::Error;

/// Unified error type for the multiquery workspace.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider transport errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index errors
    #[error("Index error: {0}")]
    Index(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// The expansion model call failed (not a parse failure)
    #[error("Query expansion failed for \"{question}\": {message}")]
    Expansion { question: String, message: String },

    /// A search call failed during fan-out
    #[error("Retrieval failed for query \"{query}\": {message}")]
    Retrieval { query: String, message: String },

    /// The final answer generation call failed
    #[error("Answer generation failed for \"{question}\": {message}")]
    Generation { question: String, message: String },

    /// The request-level deadline elapsed
    #[error("Request timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Whether this error is a typed failure of an external capability
    /// that terminated a pipeline run.
    pub fn is_fatal_external(&self) -> bool {
        matches!(
            self,
            AppError::Expansion { .. }
                | AppError::Retrieval { .. }
                | AppError::Generation { .. }
                | AppError::Timeout { .. }
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_error_names_query() {
        let err = AppError::Retrieval {
            query: "Node.js key features".to_string(),
            message: "connection refused".to_string(),
        };

        let text = err.to_string();
        assert!(text.contains("Node.js key features"));
        assert!(text.contains("connection refused"));
        assert!(err.is_fatal_external());
    }

    #[test]
    fn test_config_error_is_not_external() {
        let err = AppError::Config("bad".to_string());
        assert!(!err.is_fatal_external());
    }

    #[test]
    fn test_timeout_reports_sub_second_deadline() {
        let err = AppError::Timeout { millis: 250 };
        assert_eq!(err.to_string(), "Request timed out after 250ms");
        assert!(err.is_fatal_external());
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<Vec<String>>("[1,").unwrap_err();
        let err: AppError = parse_err.into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
