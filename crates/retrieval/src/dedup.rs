//! Order-preserving deduplication by exact content.

use crate::types::{DocumentPool, RetrievedDocument};
use std::collections::HashSet;

/// Keep the first occurrence of each distinct content string.
///
/// Later duplicates are dropped together with their query tag, so a passage
/// found by several queries stays attributed to the first one only.
pub fn deduplicate(documents: Vec<RetrievedDocument>) -> DocumentPool {
    let mut seen: HashSet<String> = HashSet::with_capacity(documents.len());

    let unique = documents
        .into_iter()
        .filter(|doc| seen.insert(doc.content.clone()))
        .collect();

    DocumentPool::from_unique(unique)
}
