//! Prompts command handler.

use super::print_json;
use clap::Args;
use multiquery_core::{config::AppConfig, AppResult};
use multiquery_prompt::{list_prompts, BUILTIN_PROMPT_IDS};
use serde::Serialize;

/// List available prompt templates
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct PromptListing {
    id: String,
    overridden: bool,
}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let overrides = list_prompts(&config.workspace)?;

        let mut listings: Vec<PromptListing> = BUILTIN_PROMPT_IDS
            .iter()
            .map(|id| PromptListing {
                id: id.to_string(),
                overridden: overrides.iter().any(|o| o == id),
            })
            .collect();

        // Workspace-only prompts are listed too, though the pipeline ignores them.
        listings.extend(
            overrides
                .iter()
                .filter(|id| !BUILTIN_PROMPT_IDS.contains(&id.as_str()))
                .map(|id| PromptListing {
                    id: id.clone(),
                    overridden: true,
                }),
        );

        if self.json {
            return print_json(&listings);
        }

        for listing in &listings {
            let source = if listing.overridden { "workspace" } else { "builtin" };
            println!("{:<20} {}", listing.id, source);
        }

        Ok(())
    }
}
