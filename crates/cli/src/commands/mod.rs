//! Command handlers for the multiquery CLI.

pub mod ask;
pub mod expand;
pub mod prompts;
pub mod search;

pub use ask::AskCommand;
pub use expand::ExpandCommand;
pub use prompts::PromptsCommand;
pub use search::SearchCommand;

use multiquery_core::{AppError, AppResult};
use multiquery_retrieval::ExpansionMode;

/// Parse an `--mode` value.
pub fn parse_mode(value: &str) -> Result<ExpansionMode, String> {
    ExpansionMode::parse(value)
        .ok_or_else(|| format!("unknown mode '{}' (expected decompose or paraphrase)", value))
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("paraphrase"), Ok(ExpansionMode::Paraphrase));
        assert!(parse_mode("rerank").is_err());
    }
}
