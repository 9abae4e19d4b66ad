//! Prompt types.
//!
//! A prompt is an ordered list of role/template pairs. Rendering substitutes
//! variables into each template and yields concrete chat messages.

use multiquery_llm::{ChatMessage, ChatRole};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition loaded from YAML or taken from the built-ins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Role/template pairs, rendered in order
    pub messages: Vec<MessageTemplate>,
}

/// One role-tagged template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    /// Message role ("system", "human"/"user", "assistant")
    pub role: ChatRole,

    /// Template string with Handlebars syntax
    pub template: String,
}

impl MessageTemplate {
    pub fn new(role: ChatRole, template: impl Into<String>) -> Self {
        Self {
            role,
            template: template.into(),
        }
    }
}

/// A fully rendered prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Rendered messages in template order
    pub messages: Vec<ChatMessage>,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        messages: Vec<ChatMessage>,
        source_prompt_id: String,
        resolved_variables: HashMap<String, String>,
    ) -> Self {
        Self {
            messages,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                resolved_variables,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: rag.answer
title: Answer from context
apiVersion: "1.0"
createdBy: test
messages:
  - role: system
    template: "Context: {{context}}"
  - role: human
    template: "{{question}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "rag.answer");
        assert_eq!(def.messages.len(), 2);
        assert_eq!(def.messages[0].role, ChatRole::System);
        assert_eq!(def.messages[1].role, ChatRole::User);
    }

    #[test]
    fn test_built_prompt_creation() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "test".to_string());

        let built = BuiltPrompt::new(
            vec![ChatMessage::user("test")],
            "rag.answer".to_string(),
            vars,
        );

        assert_eq!(built.messages.len(), 1);
        assert_eq!(built.metadata.source_prompt_id, "rag.answer");
        assert_eq!(
            built.metadata.resolved_variables.get("question"),
            Some(&"test".to_string())
        );
    }
}
