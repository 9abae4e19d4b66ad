//! Expand command handler.

use super::{parse_mode, print_json};
use clap::Args;
use multiquery_core::{config::AppConfig, AppResult};
use multiquery_retrieval::{build_pipeline, ExpansionMode, ExpansionOutcome};

/// Show how a question expands into search queries
#[derive(Args, Debug)]
pub struct ExpandCommand {
    /// The question to expand
    pub question: String,

    /// Expansion mode (decompose, paraphrase)
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<ExpansionMode>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ExpandCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing expand command");

        let pipeline = build_pipeline(config)?;
        let expansion = pipeline.expand(&self.question, self.mode).await?;

        if self.json {
            return print_json(&expansion);
        }

        println!("Raw output:");
        println!("{}", expansion.raw);
        println!();
        println!("Cleaned output:");
        println!("{}", expansion.cleaned);
        println!();

        if let ExpansionOutcome::Fallback(reason) = &expansion.outcome {
            println!("Fallback: {}", reason);
        }

        println!("Queries:");
        for query in expansion.queries.iter() {
            println!("  [{:?}] {}", query.role, query.text);
        }

        Ok(())
    }
}
