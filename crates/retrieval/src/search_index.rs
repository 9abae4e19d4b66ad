//! Search capability used by retrieval fan-out.

use crate::types::SearchHit;
use async_trait::async_trait;
use multiquery_core::AppResult;

/// Read-only similarity search over a pre-built index.
///
/// Implementations return at most `k` hits, ordered by descending relevance.
/// Handles are shared across concurrent pipeline runs and must not mutate.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Short name for logs (e.g. "qdrant").
    fn name(&self) -> &str;

    /// Find the `k` passages most similar to `query`.
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<SearchHit>>;
}
