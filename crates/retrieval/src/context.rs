//! Context assembly for the answer prompt.

use crate::types::DocumentPool;

/// Join document contents in pool order, one per line.
///
/// No size limit is applied; an empty pool gives an empty string.
pub fn assemble_context(pool: &DocumentPool) -> String {
    pool.iter()
        .map(|doc| doc.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::deduplicate;
    use crate::types::{Query, RetrievedDocument, SearchHit};

    #[test]
    fn test_joins_with_newlines() {
        let query = Query::original("q");
        let pool = deduplicate(
            ["first", "second", "third"]
                .into_iter()
                .map(|c| RetrievedDocument::from_hit(SearchHit::new(c, serde_json::Value::Null), &query))
                .collect(),
        );

        assert_eq!(assemble_context(&pool), "first\nsecond\nthird");
    }

    #[test]
    fn test_empty_pool_is_empty_context() {
        assert_eq!(assemble_context(&deduplicate(Vec::new())), "");
    }
}
