//! Prompt-template capability for the multiquery workspace.
//!
//! This crate provides:
//! - Two-role prompt definitions (YAML overrides or built-ins)
//! - Handlebars rendering into chat messages
//! - Built-in answer, decomposition, and paraphrase prompts

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use defaults::{
    builtin_prompt, ANSWER_PROMPT_ID, BUILTIN_PROMPT_IDS, DECOMPOSE_PROMPT_ID, PARAPHRASE_PROMPT_ID,
};
pub use loader::{list_prompts, load_prompt, prompts_dir, resolve_prompt, validate_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, MessageTemplate, PromptDefinition};
