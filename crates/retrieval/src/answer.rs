//! Final answer generation.

use crate::types::{GenerationRequest, GenerationResult};
use multiquery_core::{AppError, AppResult};
use multiquery_llm::{LlmClient, LlmRequest};
use multiquery_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Renders the answer prompt and calls the model once.
///
/// Insufficient context is handled by the prompt's instructions alone; the
/// answer text is returned as the model wrote it.
#[derive(Clone)]
pub struct AnswerGenerator {
    llm: Arc<dyn LlmClient>,
    model: String,
    temperature: Option<f32>,
    prompt: PromptDefinition,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, prompt: PromptDefinition) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature: None,
            prompt,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub async fn generate(&self, request: &GenerationRequest) -> AppResult<GenerationResult> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), request.question.clone());
        variables.insert("context".to_string(), request.context.clone());

        let built = build_prompt(&self.prompt, variables)?;

        let mut llm_request = LlmRequest::new(built.messages, self.model.clone());
        if let Some(temperature) = self.temperature {
            llm_request = llm_request.with_temperature(temperature);
        }

        tracing::debug!(
            model = %self.model,
            context_len = request.context.len(),
            "Generating answer"
        );

        let response = self
            .llm
            .complete(&llm_request)
            .await
            .map_err(|e| AppError::Generation {
                question: request.question.clone(),
                message: e.to_string(),
            })?;

        Ok(GenerationResult {
            answer: response.content,
            model: response.model,
            usage: response.usage,
        })
    }
}
