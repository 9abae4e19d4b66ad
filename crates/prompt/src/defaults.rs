//! Built-in prompt definitions.
//!
//! These are used whenever the workspace does not override a prompt id in
//! `.multiquery/prompts/<id>.yml`.

use crate::types::{MessageTemplate, PromptDefinition};
use multiquery_llm::ChatRole;

/// Final answer prompt: system carries instructions and context, human carries the question.
pub const ANSWER_PROMPT_ID: &str = "rag.answer";

/// Splits a complex question into simpler sub-questions.
pub const DECOMPOSE_PROMPT_ID: &str = "expand.decompose";

/// Rephrases a question into alternative search queries.
pub const PARAPHRASE_PROMPT_ID: &str = "expand.paraphrase";

/// All built-in prompt ids.
pub const BUILTIN_PROMPT_IDS: [&str; 3] = [ANSWER_PROMPT_ID, DECOMPOSE_PROMPT_ID, PARAPHRASE_PROMPT_ID];

const ANSWER_SYSTEM: &str = "You are a helpful assistant that answers questions based on the provided context.
Answer only from the context below.
If the information cannot be found in the context, say you don't know.

Context: {{context}}";

const DECOMPOSE_SYSTEM: &str = "You are an AI assistant that helps break down complex questions into simpler sub-questions. \
Return only an array of 2-4 sub-questions in JSON format.";

const DECOMPOSE_HUMAN: &str = "Break down this complex query into simple sub-queries that together help answer the original question: \"{{question}}\".
Format your response as a valid JSON array of strings. For example: [\"sub-question 1\", \"sub-question 2\", \"sub-question 3\"]";

const PARAPHRASE_SYSTEM: &str = "You are an AI assistant that improves document retrieval by rewriting a question into alternative search queries. \
Each query should phrase the same information need differently. \
Return only an array of 2-4 queries in JSON format.";

const PARAPHRASE_HUMAN: &str = "Generate alternative search queries for this question: \"{{question}}\".
Format your response as a valid JSON array of strings. For example: [\"query 1\", \"query 2\", \"query 3\"]";

/// Look up a built-in prompt definition by id.
pub fn builtin_prompt(id: &str) -> Option<PromptDefinition> {
    let (title, messages) = match id {
        ANSWER_PROMPT_ID => (
            "Answer from retrieved context",
            vec![
                MessageTemplate::new(ChatRole::System, ANSWER_SYSTEM),
                MessageTemplate::new(ChatRole::User, "{{question}}"),
            ],
        ),
        DECOMPOSE_PROMPT_ID => (
            "Decompose into sub-questions",
            vec![
                MessageTemplate::new(ChatRole::System, DECOMPOSE_SYSTEM),
                MessageTemplate::new(ChatRole::User, DECOMPOSE_HUMAN),
            ],
        ),
        PARAPHRASE_PROMPT_ID => (
            "Paraphrase into search queries",
            vec![
                MessageTemplate::new(ChatRole::System, PARAPHRASE_SYSTEM),
                MessageTemplate::new(ChatRole::User, PARAPHRASE_HUMAN),
            ],
        ),
        _ => return None,
    };

    Some(PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        created_by: "builtin".to_string(),
        messages,
    })
}
