//! Retrieval fan-out: one search call per query, re-joined in query order.

use crate::search_index::SearchIndex;
use crate::types::{Query, QuerySet, RetrievedDocument};
use futures::stream::{self, StreamExt, TryStreamExt};
use multiquery_core::{AppError, AppResult};
use serde::Serialize;

/// Documents retrieved by one query, in relevance order.
#[derive(Debug, Clone, Serialize)]
pub struct QueryHits {
    pub query: Query,
    pub documents: Vec<RetrievedDocument>,
}

/// Per-query retrieval results, in query-set order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FanoutResult {
    pub batches: Vec<QueryHits>,
}

impl FanoutResult {
    /// `(query text, documents retrieved)` for each query.
    pub fn counts(&self) -> Vec<(String, usize)> {
        self.batches
            .iter()
            .map(|batch| (batch.query.text.clone(), batch.documents.len()))
            .collect()
    }

    /// Total documents before deduplication.
    pub fn total(&self) -> usize {
        self.batches.iter().map(|batch| batch.documents.len()).sum()
    }

    /// Concatenate all batches in order.
    pub fn into_documents(self) -> Vec<RetrievedDocument> {
        self.batches
            .into_iter()
            .flat_map(|batch| batch.documents)
            .collect()
    }
}

/// Search every query, at most `max_concurrency` at a time.
///
/// Completion order never affects output order: batches follow the query
/// set, and each batch keeps the index's relevance order. The first failed
/// search aborts the whole fan-out.
pub async fn fan_out(
    index: &dyn SearchIndex,
    queries: &QuerySet,
    top_k: usize,
    max_concurrency: usize,
) -> AppResult<FanoutResult> {
    let limit = max_concurrency.max(1).min(queries.len().max(1));

    tracing::debug!(
        index = index.name(),
        queries = queries.len(),
        top_k,
        limit,
        "Starting retrieval fan-out"
    );

    let batches: Vec<QueryHits> = stream::iter(queries.iter().cloned())
        .map(|query| async move {
            let hits = match index.search(&query.text, top_k).await {
                Ok(hits) => hits,
                Err(e) => {
                    return Err(AppError::Retrieval {
                        query: query.text,
                        message: e.to_string(),
                    })
                }
            };

            tracing::debug!(query = %query.text, hits = hits.len(), "Search returned");

            let documents = hits
                .into_iter()
                .map(|hit| RetrievedDocument::from_hit(hit, &query))
                .collect();

            Ok(QueryHits { query, documents })
        })
        .buffered(limit)
        .try_collect()
        .await?;

    Ok(FanoutResult { batches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExpansionMode, SearchHit};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns `<query>-<n>` hits and tracks peak concurrency.
    struct CountingIndex {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CountingIndex {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SearchIndex for CountingIndex {
        fn name(&self) -> &str {
            "counting"
        }

        async fn search(&self, query: &str, k: usize) -> AppResult<Vec<SearchHit>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if query == "broken" {
                return Err(AppError::Index("connection reset".to_string()));
            }

            Ok((0..k)
                .map(|n| SearchHit::new(format!("{}-{}", query, n), serde_json::Value::Null))
                .collect())
        }
    }

    fn query_set(texts: &[&str]) -> QuerySet {
        QuerySet::expanded(
            "unused",
            ExpansionMode::Decompose,
            texts.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_results_follow_query_order() {
        let index = CountingIndex::new();
        let result = fan_out(&index, &query_set(&["a", "b"]), 2, 8).await.unwrap();

        let contents: Vec<_> = result
            .clone()
            .into_documents()
            .into_iter()
            .map(|d| d.content)
            .collect();
        assert_eq!(contents, vec!["a-0", "a-1", "b-0", "b-1"]);
        assert_eq!(result.total(), 4);
        assert_eq!(result.counts(), vec![("a".to_string(), 2), ("b".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_documents_are_tagged_with_their_query() {
        let index = CountingIndex::new();
        let result = fan_out(&index, &query_set(&["a", "b"]), 1, 8).await.unwrap();

        for batch in &result.batches {
            assert!(batch.documents.iter().all(|d| d.query == batch.query));
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let index = CountingIndex::new();
        fan_out(&index, &query_set(&["a", "b", "c", "d", "e"]), 1, 2)
            .await
            .unwrap();
        assert!(index.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_makes_progress() {
        let index = CountingIndex::new();
        let result = fan_out(&index, &query_set(&["a", "b"]), 1, 0).await.unwrap();
        assert_eq!(result.total(), 2);
        assert_eq!(index.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_names_the_query() {
        let index = CountingIndex::new();
        let err = fan_out(&index, &query_set(&["a", "broken", "c"]), 1, 8)
            .await
            .unwrap_err();

        match err {
            AppError::Retrieval { query, message } => {
                assert_eq!(query, "broken");
                assert!(message.contains("connection reset"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
