//! Retrieval pipeline type definitions.
//!
//! Everything here lives for a single pipeline run; only the index and model
//! handles outlive it.

use multiquery_llm::LlmUsage;
use serde::{Deserialize, Serialize};

/// How a question is turned into search queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionMode {
    /// Split into independent sub-questions; the original is not searched.
    Decompose,
    /// Generate rephrasings; the original is searched first.
    Paraphrase,
}

impl ExpansionMode {
    /// Parse a mode name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "decompose" | "decomposition" => Some(Self::Decompose),
            "paraphrase" | "multi-query" | "multiquery" => Some(Self::Paraphrase),
            _ => None,
        }
    }

    /// Get the canonical mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decompose => "decompose",
            Self::Paraphrase => "paraphrase",
        }
    }

    /// Role tag given to generated queries in this mode.
    pub fn generated_role(&self) -> QueryRole {
        match self {
            Self::Decompose => QueryRole::Decomposed,
            Self::Paraphrase => QueryRole::Paraphrase,
        }
    }
}

impl std::fmt::Display for ExpansionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a search query came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryRole {
    Original,
    Decomposed,
    Paraphrase,
}

/// A search string tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub role: QueryRole,
}

impl Query {
    pub fn new(text: impl Into<String>, role: QueryRole) -> Self {
        Self {
            text: text.into(),
            role,
        }
    }

    pub fn original(text: impl Into<String>) -> Self {
        Self::new(text, QueryRole::Original)
    }
}

/// Ordered, never-empty sequence of queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuerySet(Vec<Query>);

impl QuerySet {
    /// The fallback set: just the original question.
    pub fn original(question: impl Into<String>) -> Self {
        Self(vec![Query::original(question)])
    }

    /// Build the set for a successful expansion.
    ///
    /// Decompose mode uses the generated queries as-is; paraphrase mode puts
    /// the original question first. Returns `None` when decomposition yields
    /// nothing, since the set may never be empty.
    pub fn expanded(question: &str, mode: ExpansionMode, generated: Vec<String>) -> Option<Self> {
        let role = mode.generated_role();
        let mut queries = Vec::with_capacity(generated.len() + 1);

        if mode == ExpansionMode::Paraphrase {
            queries.push(Query::original(question));
        }
        queries.extend(generated.into_iter().map(|text| Query::new(text, role)));

        if queries.is_empty() {
            None
        } else {
            Some(Self(queries))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Query> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Query] {
        &self.0
    }

    /// Query strings in order.
    pub fn texts(&self) -> Vec<&str> {
        self.0.iter().map(|q| q.text.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a QuerySet {
    type Item = &'a Query;
    type IntoIter = std::slice::Iter<'a, Query>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One passage returned by the search capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Passage text
    pub content: String,

    /// Opaque source metadata
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// Similarity score, when the index reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl SearchHit {
    pub fn new(content: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            content: content.into(),
            metadata,
            score: None,
        }
    }
}

/// A passage tagged with the query that retrieved it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,

    #[serde(default)]
    pub metadata: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,

    /// Query whose search produced this passage
    pub query: Query,
}

impl RetrievedDocument {
    pub fn from_hit(hit: SearchHit, query: &Query) -> Self {
        Self {
            content: hit.content,
            metadata: hit.metadata,
            score: hit.score,
            query: query.clone(),
        }
    }
}

/// Content-unique documents in first-occurrence order.
///
/// Only `dedup::deduplicate` builds one, which keeps the uniqueness invariant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DocumentPool {
    documents: Vec<RetrievedDocument>,
}

impl DocumentPool {
    pub(crate) fn from_unique(documents: Vec<RetrievedDocument>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RetrievedDocument> {
        self.documents.iter()
    }

    pub fn as_slice(&self) -> &[RetrievedDocument] {
        &self.documents
    }

    pub fn into_documents(self) -> Vec<RetrievedDocument> {
        self.documents
    }
}

/// Input to the final answer call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The user's original question
    pub question: String,

    /// Assembled context; may be empty
    pub context: String,
}

/// Raw answer text from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub answer: String,
    pub model: String,
    pub usage: LlmUsage,
}

/// Options for one question.
#[derive(Debug, Clone)]
pub struct AskOptions {
    /// Question text
    pub question: String,

    /// Expansion mode override (pipeline default otherwise)
    pub mode: Option<ExpansionMode>,

    /// Per-query document count override (pipeline default otherwise)
    pub top_k: Option<usize>,
}

impl AskOptions {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            mode: None,
            top_k: None,
        }
    }

    pub fn with_mode(mut self, mode: ExpansionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(ExpansionMode::parse("decompose"), Some(ExpansionMode::Decompose));
        assert_eq!(ExpansionMode::parse("Paraphrase"), Some(ExpansionMode::Paraphrase));
        assert_eq!(ExpansionMode::parse("multi-query"), Some(ExpansionMode::Paraphrase));
        assert_eq!(ExpansionMode::parse("hyde"), None);
    }

    #[test]
    fn test_decomposed_set_excludes_original() {
        let set = QuerySet::expanded(
            "Q",
            ExpansionMode::Decompose,
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap();

        assert_eq!(set.texts(), vec!["a", "b"]);
        assert!(set.iter().all(|q| q.role == QueryRole::Decomposed));
    }

    #[test]
    fn test_paraphrased_set_prepends_original() {
        let set = QuerySet::expanded("Q", ExpansionMode::Paraphrase, vec!["a".to_string()]).unwrap();

        assert_eq!(set.texts(), vec!["Q", "a"]);
        assert_eq!(set.as_slice()[0].role, QueryRole::Original);
        assert_eq!(set.as_slice()[1].role, QueryRole::Paraphrase);
    }

    #[test]
    fn test_empty_decomposition_is_rejected() {
        assert!(QuerySet::expanded("Q", ExpansionMode::Decompose, Vec::new()).is_none());
    }

    #[test]
    fn test_query_set_serializes_as_array() {
        let set = QuerySet::original("Q");
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!([{"text": "Q", "role": "original"}]));
    }
}
