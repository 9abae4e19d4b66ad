//! Prompt builder for rendering role/template pairs into chat messages.

use crate::types::{BuiltPrompt, PromptDefinition};
use multiquery_core::{AppError, AppResult};
use multiquery_llm::ChatMessage;
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Rendering is plain substitution: every message template is rendered with
/// the same variable map, in definition order. Missing variables render as
/// the empty string and values are never HTML-escaped.
///
/// # Example
/// ```no_run
/// use multiquery_prompt::{build_prompt, builtin_prompt, ANSWER_PROMPT_ID};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt(ANSWER_PROMPT_ID).expect("built-in exists");
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What is Node.js?".to_string());
/// vars.insert("context".to_string(), "Node.js is a runtime.".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("{} messages", built.messages.len());
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let handlebars = create_renderer();

    let messages = definition
        .messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            let content = render_template(&handlebars, &definition.id, i, &message.template, &variables)?;
            Ok(ChatMessage::new(message.role, content))
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(BuiltPrompt::new(messages, definition.id.clone(), variables))
}

fn create_renderer() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();

    // Plain text output, no HTML escaping
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
}

/// Render one Handlebars template with variables.
fn render_template(
    handlebars: &Handlebars<'static>,
    prompt_id: &str,
    index: usize,
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    handlebars
        .render_template(template, variables)
        .map_err(|e| {
            AppError::Prompt(format!(
                "Failed to render message {} of prompt '{}': {}",
                index, prompt_id, e
            ))
        })
}
