//! Qdrant-backed search index.
//!
//! Embeds the query, then calls the REST search endpoint of one collection.
//! The collection is populated out-of-band; this handle only reads.

use crate::embeddings::EmbeddingProvider;
use crate::search_index::SearchIndex;
use crate::types::SearchHit;
use async_trait::async_trait;
use multiquery_core::config::IndexConfig;
use multiquery_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Qdrant collection reader.
#[derive(Debug, Clone)]
pub struct QdrantIndex {
    client: Client,
    url: String,
    collection: String,
    api_key: Option<String>,
    content_key: String,
    metadata_key: String,
    embedder: Arc<dyn EmbeddingProvider>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    payload: Option<serde_json::Map<String, Value>>,
}

impl QdrantIndex {
    /// Create an index reader from configuration.
    pub fn new(config: &IndexConfig, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Index(format!("Failed to create HTTP client for Qdrant: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            api_key: config.resolve_api_key(),
            content_key: config.content_key.clone(),
            metadata_key: config.metadata_key.clone(),
            embedder,
        })
    }

    fn search_url(&self) -> String {
        format!("{}/collections/{}/points/search", self.url, self.collection)
    }

    /// Convert scored points into hits, keeping their order.
    fn hits_from_points(&self, points: Vec<ScoredPoint>) -> Vec<SearchHit> {
        points
            .into_iter()
            .filter_map(|point| {
                let mut payload = point.payload.unwrap_or_default();

                let content = match payload.remove(&self.content_key) {
                    Some(Value::String(content)) => content,
                    _ => {
                        warn!(
                            point = %point.id,
                            key = %self.content_key,
                            "Skipping point without string content"
                        );
                        return None;
                    }
                };

                let metadata = payload.remove(&self.metadata_key).unwrap_or(Value::Null);

                Some(SearchHit {
                    content,
                    metadata,
                    score: point.score,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SearchIndex for QdrantIndex {
    fn name(&self) -> &str {
        "qdrant"
    }

    #[instrument(skip(self, query), fields(collection = %self.collection, k))]
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<SearchHit>> {
        let vector = self.embedder.embed(query).await?;

        let mut request = self.client.post(self.search_url()).json(&SearchRequest {
            vector: &vector,
            limit: k,
            with_payload: true,
        });
        if let Some(ref api_key) = self.api_key {
            request = request.header("api-key", api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Index(format!("Failed to send request to Qdrant: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Index(format!(
                "Qdrant search error ({}): {}",
                status, error_text
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Index(format!("Failed to parse Qdrant response: {}", e)))?;

        let hits = self.hits_from_points(body.result);
        debug!(hits = hits.len(), "Qdrant search complete");

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        fn provider_name(&self) -> &str {
            "fixed"
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn embed(&self, _text: &str) -> AppResult<Vec<f32>> {
            Ok(vec![0.0, 1.0])
        }
    }

    fn test_index(config: &IndexConfig) -> QdrantIndex {
        QdrantIndex::new(config, Arc::new(FixedEmbedder)).unwrap()
    }

    #[test]
    fn test_search_url() {
        let config = IndexConfig {
            url: "http://qdrant:6333/".to_string(),
            ..IndexConfig::default()
        };
        let index = test_index(&config);
        assert_eq!(
            index.search_url(),
            "http://qdrant:6333/collections/pdf-rag-new/points/search"
        );
    }

    #[test]
    fn test_request_format() {
        let body = serde_json::to_value(SearchRequest {
            vector: &[0.5, 0.25],
            limit: 3,
            with_payload: true,
        })
        .unwrap();
        assert_eq!(body, json!({"vector": [0.5, 0.25], "limit": 3, "with_payload": true}));
    }

    #[test]
    fn test_points_become_hits_in_order() {
        let index = test_index(&IndexConfig::default());
        let response: SearchResponse = serde_json::from_value(json!({
            "result": [
                {"id": 1, "score": 0.9, "payload": {"content": "first", "metadata": {"page": 1}}},
                {"id": 2, "score": 0.8, "payload": {"content": 7}},
                {"id": 3, "score": 0.7},
                {"id": 4, "score": 0.6, "payload": {"content": "second"}}
            ],
            "status": "ok"
        }))
        .unwrap();

        let hits = index.hits_from_points(response.result);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "first");
        assert_eq!(hits[0].metadata, json!({"page": 1}));
        assert_eq!(hits[0].score, Some(0.9));
        assert_eq!(hits[1].content, "second");
        assert_eq!(hits[1].metadata, Value::Null);
    }

    #[test]
    fn test_custom_payload_keys() {
        let config = IndexConfig {
            content_key: "page_content".to_string(),
            metadata_key: "meta".to_string(),
            ..IndexConfig::default()
        };
        let index = test_index(&config);
        let response: SearchResponse = serde_json::from_value(json!({
            "result": [{"id": "a", "payload": {"page_content": "text", "meta": {"source": "x.pdf"}}}]
        }))
        .unwrap();

        let hits = index.hits_from_points(response.result);
        assert_eq!(hits[0].content, "text");
        assert_eq!(hits[0].metadata["source"], "x.pdf");
        assert_eq!(hits[0].score, None);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_index_error() {
        let config = IndexConfig {
            url: "http://127.0.0.1:1".to_string(),
            ..IndexConfig::default()
        };
        let index = test_index(&config);
        let result = index.search("query", 3).await;
        assert!(matches!(result, Err(AppError::Index(_))));
    }
}
