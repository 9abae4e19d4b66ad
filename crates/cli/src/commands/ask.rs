//! Ask command handler.
//!
//! Runs the full pipeline and prints each stage's output.

use super::{parse_mode, print_json};
use clap::Args;
use multiquery_core::{config::AppConfig, AppResult};
use multiquery_retrieval::{build_pipeline, AskOptions, ExpansionMode, PipelineReport};

const DEFAULT_QUESTION: &str =
    "What are the key features of Node.js and how do you build a weather application with it?";

/// Answer a question from the index
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to answer
    #[arg(default_value = DEFAULT_QUESTION)]
    pub question: String,

    /// Expansion mode (decompose, paraphrase)
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<ExpansionMode>,

    /// Documents per search query
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let pipeline = build_pipeline(config)?;

        let mut options = AskOptions::new(self.question.clone());
        options.mode = self.mode;
        options.top_k = self.top_k;

        let report = pipeline.run(options).await?;

        if self.json {
            print_json(&report)
        } else {
            print_report(&report);
            Ok(())
        }
    }
}

fn print_report(report: &PipelineReport) {
    println!("Question: {}", report.question);
    println!("Mode: {}", report.mode);
    println!();

    println!("Raw expansion output:");
    println!("{}", report.expansion.raw);
    println!();

    println!("Cleaned expansion output:");
    println!("{}", report.expansion.cleaned);
    println!();

    if report.expansion.outcome.is_fallback() {
        println!("Expansion output unusable, searching with the original question.");
    }
    println!("Queries:");
    for (i, query) in report.expansion.queries.iter().enumerate() {
        println!("  {}. {}", i + 1, query.text);
    }
    println!();

    println!("Retrieved documents:");
    for count in &report.retrieval_counts {
        println!("  {} -> {}", count.query, count.documents);
    }
    println!(
        "Total: {}, after deduplication: {}",
        report.total_documents, report.unique_documents
    );
    println!();

    println!("Answer:");
    println!("{}", report.answer);
}
