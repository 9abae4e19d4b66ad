//! Multi-query retrieval-augmented answering.
//!
//! A question is expanded into search queries (decomposition or paraphrase),
//! each query is searched against a read-only vector index, the results are
//! merged without duplicates, and the model answers from the joined context.
//!
//! # Example
//! ```no_run
//! use multiquery_core::AppConfig;
//! use multiquery_retrieval::{build_pipeline, AskOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let pipeline = build_pipeline(&config)?;
//! let report = pipeline.run(AskOptions::new("What is Node.js?")).await?;
//! println!("{}", report.answer);
//! # Ok(())
//! # }
//! ```

pub mod answer;
pub mod context;
pub mod dedup;
pub mod embeddings;
pub mod expansion;
pub mod fanout;
pub mod pipeline;
pub mod qdrant_index;
pub mod search_index;
pub mod setup;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use answer::AnswerGenerator;
pub use context::assemble_context;
pub use dedup::deduplicate;
pub use expansion::{
    parse_query_array, strip_code_fence, Expansion, ExpansionOutcome, FallbackReason,
    QueryExpander,
};
pub use fanout::{fan_out, FanoutResult, QueryHits};
pub use pipeline::{
    Pipeline, PipelineReport, PipelineSettings, PipelineStage, PromptSet, QueryCount,
};
pub use qdrant_index::QdrantIndex;
pub use search_index::SearchIndex;
pub use setup::{build_index, build_llm, build_pipeline, pipeline_settings};
pub use types::{
    AskOptions, DocumentPool, ExpansionMode, GenerationRequest, GenerationResult, Query,
    QueryRole, QuerySet, RetrievedDocument, SearchHit,
};
