//! Search command handler.

use super::print_json;
use clap::Args;
use multiquery_core::{config::AppConfig, AppResult};
use multiquery_retrieval::build_pipeline;

/// Run a single search against the index
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Search query text
    pub query: String,

    /// Number of documents to return
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");

        let pipeline = build_pipeline(config)?;
        let hits = pipeline.search(&self.query, self.top_k).await?;

        if self.json {
            return print_json(&hits);
        }

        if hits.is_empty() {
            println!("No documents found.");
            return Ok(());
        }

        for (i, hit) in hits.iter().enumerate() {
            match hit.score {
                Some(score) => println!("{}. (score {:.3})", i + 1, score),
                None => println!("{}.", i + 1),
            }
            println!("{}", hit.content);
            if !hit.metadata.is_null() {
                println!("  metadata: {}", hit.metadata);
            }
            println!();
        }

        Ok(())
    }
}
