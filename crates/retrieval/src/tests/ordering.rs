//! Ordering, deadline and sharing behaviour.

use super::fakes::{settings, test_pipeline, FakeIndex, ScriptedLlm};
use crate::dedup::deduplicate;
use crate::types::{AskOptions, Query, QueryRole, RetrievedDocument, SearchHit};
use multiquery_core::AppError;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_completion_order_does_not_change_output_order() {
    let llm = Arc::new(ScriptedLlm::expand_then_answer(r#"["slow", "fast"]"#, "answer"));
    let index = Arc::new(
        FakeIndex::new()
            .with_hits("slow", &["s1", "s2"])
            .with_hits("fast", &["f1", "f2"])
            .delayed("slow", 80),
    );
    let pipeline = test_pipeline(llm, index, settings());

    let report = pipeline.run(AskOptions::new("Q")).await.unwrap();

    let contents: Vec<_> = report.documents.iter().map(|d| d.content.as_str()).collect();
    assert_eq!(contents, vec!["s1", "s2", "f1", "f2"]);
    assert_eq!(report.retrieval_counts[0].query, "slow");
}

#[tokio::test]
async fn test_searches_run_concurrently() {
    let llm = Arc::new(ScriptedLlm::expand_then_answer(r#"["a", "b", "c", "d"]"#, "answer"));
    let index = Arc::new(
        FakeIndex::new()
            .delayed("a", 50)
            .delayed("b", 50)
            .delayed("c", 50)
            .delayed("d", 50),
    );
    let mut custom = settings();
    custom.max_concurrency = 8;
    custom.request_timeout = None;
    let pipeline = test_pipeline(llm, index.clone(), custom);

    assert!(pipeline.run(AskOptions::new("Q")).await.is_ok());
    assert_eq!(index.calls().len(), 4);
    assert_eq!(index.peak_in_flight(), 4);
}

#[tokio::test]
async fn test_concurrency_limit_caps_searches_in_flight() {
    let llm = Arc::new(ScriptedLlm::expand_then_answer(r#"["a", "b", "c", "d"]"#, "answer"));
    let index = Arc::new(
        FakeIndex::new()
            .delayed("a", 20)
            .delayed("b", 20)
            .delayed("c", 20)
            .delayed("d", 20),
    );
    let mut custom = settings();
    custom.max_concurrency = 2;
    let pipeline = test_pipeline(llm, index.clone(), custom);

    assert!(pipeline.run(AskOptions::new("Q")).await.is_ok());
    assert_eq!(index.peak_in_flight(), 2);
}

#[tokio::test]
async fn test_deadline_fails_the_whole_run() {
    let llm = Arc::new(ScriptedLlm::expand_then_answer(r#"["a"]"#, "unused"));
    let index = Arc::new(FakeIndex::new().with_hits("a", &["doc"]).delayed("a", 2_000));
    let mut custom = settings();
    custom.request_timeout = Some(Duration::from_millis(50));
    let pipeline = test_pipeline(llm.clone(), index, custom);

    let err = pipeline.run(AskOptions::new("Q")).await.unwrap_err();

    assert!(matches!(err, AppError::Timeout { millis: 50 }));
    assert!(err.to_string().contains("50ms"));
    assert_eq!(llm.requests().len(), 1);
}

#[tokio::test]
async fn test_no_deadline_when_disabled() {
    let llm = Arc::new(ScriptedLlm::expand_then_answer(r#"["a"]"#, "answer"));
    let index = Arc::new(FakeIndex::new().with_hits("a", &["doc"]).delayed("a", 20));
    let mut custom = settings();
    custom.request_timeout = None;
    let pipeline = test_pipeline(llm, index, custom);

    assert!(pipeline.run(AskOptions::new("Q")).await.is_ok());
}

#[tokio::test]
async fn test_one_pipeline_serves_concurrent_questions() {
    // Expansion echoes nothing useful; answers echo the question.
    let llm = Arc::new(ScriptedLlm::responding(|request| {
        let system = request.messages[0].content.as_str();
        if system.contains("Context:") {
            Ok(format!("answer to {}", request.messages[1].content))
        } else {
            Ok(r#"["shared query"]"#.to_string())
        }
    }));
    let index = Arc::new(FakeIndex::new().with_hits("shared query", &["doc"]).delayed("shared query", 20));
    let pipeline = test_pipeline(llm, index, settings());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run(AskOptions::new(format!("question {i}"))).await })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.answer, format!("answer to question {i}"));
        assert_eq!(report.context, "doc");
    }
}

fn doc(content: &str, query: &str) -> RetrievedDocument {
    RetrievedDocument::from_hit(
        SearchHit::new(content, serde_json::Value::Null),
        &Query::new(query, QueryRole::Paraphrase),
    )
}

#[test]
fn test_dedup_properties_hold_for_varied_inputs() {
    let inputs: Vec<Vec<RetrievedDocument>> = vec![
        vec![],
        vec![doc("a", "q")],
        vec![doc("a", "q1"), doc("a", "q2"), doc("a", "q3")],
        vec![doc("a", "q1"), doc("b", "q1"), doc("c", "q2"), doc("b", "q2"), doc("a", "q3")],
        vec![doc("x", "q1"), doc("y", "q1"), doc("z", "q1")],
    ];

    for input in inputs {
        let total = input.len();
        let has_duplicates = {
            let mut contents: Vec<_> = input.iter().map(|d| d.content.clone()).collect();
            contents.sort();
            contents.dedup();
            contents.len() != total
        };

        let pool = deduplicate(input.clone());

        assert!(pool.len() <= total);
        assert_eq!(pool.len() == total, !has_duplicates);
        assert_eq!(deduplicate(pool.clone().into_documents()), pool);

        // Survivors keep their relative order from the input.
        let positions: Vec<usize> = pool
            .iter()
            .map(|kept| {
                input
                    .iter()
                    .position(|d| d.content == kept.content)
                    .unwrap()
            })
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
