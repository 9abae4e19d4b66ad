//! Query expansion: one question in, an ordered set of search queries out.
//!
//! The model is asked for a JSON array of strings. Whatever it returns is
//! cleaned of markdown fences and parsed into an [`ExpansionOutcome`]; every
//! parse anomaly collapses to a fallback of `[original]` and never leaves
//! this module as an error.

use crate::types::{ExpansionMode, QuerySet};
use multiquery_core::{AppError, AppResult};
use multiquery_llm::{LlmClient, LlmRequest};
use multiquery_prompt::{build_prompt, PromptDefinition};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

const FENCE: &str = "```";

/// Why an expansion response could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    #[error("no JSON array found in response")]
    NoArrayFound,

    #[error("response is valid JSON but not an array")]
    NotAnArray,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("array element {index} is not a string")]
    NonStringElement { index: usize },

    #[error("array is empty")]
    EmptyArray,
}

/// Result of parsing one expansion response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ExpansionOutcome {
    Parsed(Vec<String>),
    Fallback(FallbackReason),
}

impl ExpansionOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ExpansionOutcome::Fallback(_))
    }
}

/// Everything one expansion call produced.
#[derive(Debug, Clone, Serialize)]
pub struct Expansion {
    /// Model output as returned
    pub raw: String,

    /// Output after fence stripping
    pub cleaned: String,

    pub outcome: ExpansionOutcome,

    /// Queries to search, never empty
    pub queries: QuerySet,
}

/// Remove a markdown code-fence wrapper.
///
/// Takes the text between the first fence and the next one (or the end of
/// input if the fence is never closed), drops a language tag such as `json`
/// on the opening line, and trims. Text without a fence is only trimmed.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();

    let Some(start) = trimmed.find(FENCE) else {
        return trimmed.to_string();
    };

    let after_open = &trimmed[start + FENCE.len()..];
    let body = match after_open.find(FENCE) {
        Some(end) => &after_open[..end],
        None => after_open,
    };

    strip_language_tag(body).trim().to_string()
}

/// Drop the opening line when it is a bare tag like `json` or `javascript`.
fn strip_language_tag(body: &str) -> &str {
    let Some(newline) = body.find('\n') else {
        return body;
    };

    let first_line = body[..newline].trim();
    if !first_line.is_empty() && first_line.chars().all(|c| c.is_ascii_alphanumeric()) {
        &body[newline + 1..]
    } else {
        body
    }
}

/// Parse cleaned model output as a non-empty JSON array of strings.
///
/// A strict parse comes first. If the text is not valid JSON at all, the span
/// from the first `[` to the last `]` gets a second chance, which recovers
/// arrays wrapped in prose. Valid JSON of any other shape is rejected.
pub fn parse_query_array(cleaned: &str) -> ExpansionOutcome {
    let value = match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => value,
        Err(strict_err) => match extract_array_span(cleaned) {
            None if !cleaned.contains('[') => {
                return ExpansionOutcome::Fallback(FallbackReason::NoArrayFound)
            }
            None => {
                return ExpansionOutcome::Fallback(FallbackReason::InvalidJson(
                    strict_err.to_string(),
                ))
            }
            Some(span) => match serde_json::from_str::<Value>(span) {
                Ok(value) => value,
                Err(e) => {
                    return ExpansionOutcome::Fallback(FallbackReason::InvalidJson(e.to_string()))
                }
            },
        },
    };

    let Value::Array(items) = value else {
        return ExpansionOutcome::Fallback(FallbackReason::NotAnArray);
    };

    if items.is_empty() {
        return ExpansionOutcome::Fallback(FallbackReason::EmptyArray);
    }

    let mut queries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::String(text) => queries.push(text),
            _ => return ExpansionOutcome::Fallback(FallbackReason::NonStringElement { index }),
        }
    }

    ExpansionOutcome::Parsed(queries)
}

fn extract_array_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Resolve the query set for a parse outcome.
pub fn resolve_queries(question: &str, mode: ExpansionMode, outcome: &ExpansionOutcome) -> QuerySet {
    match outcome {
        ExpansionOutcome::Parsed(generated) => {
            QuerySet::expanded(question, mode, generated.clone())
                .unwrap_or_else(|| QuerySet::original(question))
        }
        ExpansionOutcome::Fallback(_) => QuerySet::original(question),
    }
}

/// Turns a question into search queries with one model call.
#[derive(Clone)]
pub struct QueryExpander {
    llm: Arc<dyn LlmClient>,
    model: String,
    temperature: Option<f32>,
    decompose_prompt: PromptDefinition,
    paraphrase_prompt: PromptDefinition,
}

impl QueryExpander {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        decompose_prompt: PromptDefinition,
        paraphrase_prompt: PromptDefinition,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature: None,
            decompose_prompt,
            paraphrase_prompt,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn prompt_for(&self, mode: ExpansionMode) -> &PromptDefinition {
        match mode {
            ExpansionMode::Decompose => &self.decompose_prompt,
            ExpansionMode::Paraphrase => &self.paraphrase_prompt,
        }
    }

    /// Expand a question.
    ///
    /// Only a failure of the model call itself is an error. Unusable output
    /// is logged and replaced by `[question]`.
    pub async fn expand(&self, question: &str, mode: ExpansionMode) -> AppResult<Expansion> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());

        let built = build_prompt(self.prompt_for(mode), variables)?;

        let mut request = LlmRequest::new(built.messages, self.model.clone());
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        tracing::debug!(mode = %mode, model = %self.model, "Requesting query expansion");

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| AppError::Expansion {
                question: question.to_string(),
                message: e.to_string(),
            })?;

        let raw = response.content;
        let cleaned = strip_code_fence(&raw);
        let outcome = parse_query_array(&cleaned);

        if let ExpansionOutcome::Fallback(reason) = &outcome {
            tracing::warn!(
                mode = %mode,
                reason = %reason,
                "Expansion output unusable, searching with the original question only"
            );
        }

        let queries = resolve_queries(question, mode, &outcome);

        tracing::info!(mode = %mode, queries = queries.len(), "Expanded question");

        Ok(Expansion {
            raw,
            cleaned,
            outcome,
            queries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(items: &[&str]) -> ExpansionOutcome {
        ExpansionOutcome::Parsed(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_strip_fence_with_json_tag() {
        assert_eq!(strip_code_fence("```json\n[\"a\",\"b\"]\n```"), "[\"a\",\"b\"]");
    }

    #[test]
    fn test_strip_fence_with_javascript_tag_and_prose() {
        let text = "Here you go:\n```javascript\n[\"a\"]\n```\nHope that helps.";
        assert_eq!(strip_code_fence(text), "[\"a\"]");
    }

    #[test]
    fn test_strip_fence_without_tag() {
        assert_eq!(strip_code_fence("```\n[\"a\"]\n```"), "[\"a\"]");
        assert_eq!(strip_code_fence("```[\"a\"]```"), "[\"a\"]");
    }

    #[test]
    fn test_strip_unterminated_fence() {
        assert_eq!(strip_code_fence("```json\n[\"a\"]"), "[\"a\"]");
    }

    #[test]
    fn test_plain_text_is_only_trimmed() {
        assert_eq!(strip_code_fence("  [\"a\"]\n"), "[\"a\"]");
    }

    #[test]
    fn test_parse_well_formed_array() {
        assert_eq!(parse_query_array("[\"a\", \"b\"]"), parsed(&["a", "b"]));
    }

    #[test]
    fn test_parse_keeps_more_than_four_items() {
        let outcome = parse_query_array("[\"1\",\"2\",\"3\",\"4\",\"5\",\"6\"]");
        assert_eq!(outcome, parsed(&["1", "2", "3", "4", "5", "6"]));
    }

    #[test]
    fn test_parse_keeps_empty_strings() {
        assert_eq!(parse_query_array("[\"\", \"b\"]"), parsed(&["", "b"]));
    }

    #[test]
    fn test_parse_array_wrapped_in_prose() {
        let outcome = parse_query_array("Sure! [\"a\", \"b\"] are good queries.");
        assert_eq!(outcome, parsed(&["a", "b"]));
    }

    #[test]
    fn test_parse_object_is_not_an_array() {
        let outcome = parse_query_array("{\"queries\": [\"a\", \"b\"]}");
        assert_eq!(outcome, ExpansionOutcome::Fallback(FallbackReason::NotAnArray));
    }

    #[test]
    fn test_parse_scalar_is_not_an_array() {
        assert_eq!(
            parse_query_array("\"just a string\""),
            ExpansionOutcome::Fallback(FallbackReason::NotAnArray)
        );
        assert_eq!(
            parse_query_array("42"),
            ExpansionOutcome::Fallback(FallbackReason::NotAnArray)
        );
    }

    #[test]
    fn test_parse_non_string_element() {
        assert_eq!(
            parse_query_array("[\"a\", 2, \"c\"]"),
            ExpansionOutcome::Fallback(FallbackReason::NonStringElement { index: 1 })
        );
    }

    #[test]
    fn test_parse_empty_array() {
        assert_eq!(
            parse_query_array("[]"),
            ExpansionOutcome::Fallback(FallbackReason::EmptyArray)
        );
    }

    #[test]
    fn test_parse_prose_without_array() {
        assert_eq!(
            parse_query_array("I cannot answer that."),
            ExpansionOutcome::Fallback(FallbackReason::NoArrayFound)
        );
        assert_eq!(
            parse_query_array(""),
            ExpansionOutcome::Fallback(FallbackReason::NoArrayFound)
        );
    }

    #[test]
    fn test_parse_broken_array_is_invalid_json() {
        let outcome = parse_query_array("[\"a\", \"b\"");
        assert!(matches!(
            outcome,
            ExpansionOutcome::Fallback(FallbackReason::InvalidJson(_))
        ));

        let outcome = parse_query_array("prefix [\"a\" \"b\"] suffix");
        assert!(matches!(
            outcome,
            ExpansionOutcome::Fallback(FallbackReason::InvalidJson(_))
        ));
    }

    #[test]
    fn test_resolve_queries_by_mode() {
        let outcome = parsed(&["a", "b"]);

        let decomposed = resolve_queries("Q", ExpansionMode::Decompose, &outcome);
        assert_eq!(decomposed.texts(), vec!["a", "b"]);

        let paraphrased = resolve_queries("Q", ExpansionMode::Paraphrase, &outcome);
        assert_eq!(paraphrased.texts(), vec!["Q", "a", "b"]);

        let fallback = ExpansionOutcome::Fallback(FallbackReason::EmptyArray);
        for mode in [ExpansionMode::Decompose, ExpansionMode::Paraphrase] {
            assert_eq!(resolve_queries("Q", mode, &fallback).texts(), vec!["Q"]);
        }
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(ExpansionOutcome::Fallback(
            FallbackReason::NonStringElement { index: 2 },
        ))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "fallback",
                "value": {"kind": "non_string_element", "detail": {"index": 2}}
            })
        );
    }
}
