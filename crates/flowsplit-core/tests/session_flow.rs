//! End-to-end session scenarios
//!
//! Run with: cargo test --package flowsplit-core --test session_flow

use flowsplit_core::{DecompositionSession, SessionConfig, SessionError, UpdateKind};
use flowsplit_stream::{Completion, FramingStatus};
use flowsplit_test_utils::fixtures::{
    workflow_response, NOISY_RESPONSE, NO_MARKER_RESPONSE, OVERWEIGHT_RESPONSE,
    TEST_CASE_RESPONSE, UNTERMINATED_RESPONSE,
};
use flowsplit_test_utils::{
    chunk_text, single_chars, split_inside, FailingBackend, GatedBackend, Script, ScriptedBackend,
};
use flowsplit_tree::DecompositionNode;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;

fn session() -> DecompositionSession {
    DecompositionSession::new(SessionConfig::default()).unwrap()
}

fn child_labels(session: &DecompositionSession) -> Vec<String> {
    session
        .snapshot()
        .root()
        .map(|r| r.children().iter().map(|c| c.label().to_string()).collect())
        .unwrap_or_default()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{a} vs {e}");
    }
}

#[tokio::test]
async fn overweight_batch_is_rescaled() {
    let session = session();
    let backend = ScriptedBackend::new()
        .with_script(Script::fragments(single_chars(OVERWEIGHT_RESPONSE)));

    let report = session.start("ship the feature", &backend).await.unwrap();

    assert_eq!(child_labels(&session), vec!["design", "build", "test"]);
    assert_close(&report.weights, &[1.0 / 3.0, 5.0 / 12.0, 0.25]);
    assert!(report.adjusted);
    assert_eq!(report.framing, FramingStatus::Closed);
    assert_eq!(report.completion, Completion::ArrayClosed);
}

#[tokio::test]
async fn missing_closing_marker_completes_normally() {
    let session = session();
    let backend =
        ScriptedBackend::new().with_script(Script::chunked(UNTERMINATED_RESPONSE, 7));

    let report = session.start("write a report", &backend).await.unwrap();

    assert_eq!(child_labels(&session), vec!["research", "write"]);
    assert_eq!(report.framing, FramingStatus::Unterminated);
    assert_eq!(report.completion, Completion::SourceEnded);
    assert!(!report.adjusted);
}

#[tokio::test]
async fn opening_marker_split_across_fragments() {
    let session = session();
    let fragments = split_inside(OVERWEIGHT_RESPONSE, "```json", 5);
    assert!(fragments[0].ends_with("```js"));
    let backend = ScriptedBackend::new().with_script(Script::fragments(fragments));

    session.start("ship", &backend).await.unwrap();
    assert_eq!(child_labels(&session), vec!["design", "build", "test"]);
}

#[tokio::test]
async fn transport_failure_keeps_partial_children() {
    let session = session();
    let cut = OVERWEIGHT_RESPONSE.find("{\"text\": \"build\"").unwrap();
    let backend = ScriptedBackend::new().with_script(
        Script::fragments(vec![OVERWEIGHT_RESPONSE[..cut].to_string()]).fail_after(1, "reset"),
    );

    let err = session.start("ship", &backend).await.unwrap_err();
    assert!(matches!(err, SessionError::Backend(_)));
    assert!(err.is_retryable());

    let tree = session.snapshot();
    let root = tree.root().unwrap();
    assert_eq!(root.children().len(), 1);
    let design = &root.children()[0];
    assert_eq!(design.label(), "design");
    assert_eq!(design.weight(), 0.4);
    assert!(design.flags().is_new);
    assert!(!session.is_in_flight(root.id()));
}

#[tokio::test]
async fn second_decomposition_rejected_while_streaming() {
    let session = session();
    let root = session.set_root("ship").unwrap();
    let mut updates = session.subscribe();

    let cut = OVERWEIGHT_RESPONSE.find("{\"text\": \"build\"").unwrap();
    let backend = Arc::new(GatedBackend::new(
        vec![OVERWEIGHT_RESPONSE[..cut].to_string()],
        vec![OVERWEIGHT_RESPONSE[cut..].to_string()],
    ));

    let task = {
        let session = session.clone();
        let backend = Arc::clone(&backend);
        tokio::spawn(async move { session.decompose(root, &*backend).await })
    };

    loop {
        let update = updates.recv().await.unwrap();
        if matches!(update.kind, UpdateKind::ChildAttached { .. }) {
            break;
        }
    }
    assert_eq!(child_labels(&session), vec!["design"]);

    let other = ScriptedBackend::new().with_script(Script::chunked(OVERWEIGHT_RESPONSE, 0));
    assert!(matches!(
        session.decompose(root, &other).await,
        Err(SessionError::AlreadyDecomposing(id)) if id == root
    ));
    assert!(other.requests().is_empty());

    backend.release();
    let report = task.await.unwrap().unwrap();
    assert_eq!(report.children.len(), 3);
    assert!(!session.is_in_flight(root));
}

#[tokio::test]
async fn child_decomposed_mid_stream_keeps_its_subtree() {
    let session = session();
    let root = session.set_root("ship").unwrap();
    let mut updates = session.subscribe();

    let cut = OVERWEIGHT_RESPONSE.find("{\"text\": \"build\"").unwrap();
    let backend = Arc::new(GatedBackend::new(
        vec![OVERWEIGHT_RESPONSE[..cut].to_string()],
        vec![OVERWEIGHT_RESPONSE[cut..].to_string()],
    ));

    let task = {
        let session = session.clone();
        let backend = Arc::clone(&backend);
        tokio::spawn(async move { session.decompose(root, &*backend).await })
    };

    let design = loop {
        let update = updates.recv().await.unwrap();
        if let UpdateKind::ChildAttached { child, .. } = update.kind {
            break child;
        }
    };

    let nested = ScriptedBackend::new().with_script(Script::chunked(
        &workflow_response(&[("wireframes", 0.6), ("review", 0.4)]),
        6,
    ));
    let inner = session.decompose(design, &nested).await.unwrap();
    assert_eq!(inner.children.len(), 2);

    backend.release();
    let outer = task.await.unwrap().unwrap();
    assert_eq!(outer.children.len(), 3);
    assert_eq!(outer.children[0], design);

    let design_node = session.node(design).unwrap();
    let labels: Vec<_> = design_node.children().iter().map(DecompositionNode::label).collect();
    assert_eq!(labels, ["wireframes", "review"]);
    for child in &inner.children {
        assert_eq!(session.node(*child).unwrap().depth(), 2);
    }
    assert_eq!(
        session.lineage(inner.children[1]).unwrap().ancestors,
        vec![root, design]
    );
}

#[tokio::test]
async fn malformed_records_are_skipped() {
    let session = session();
    let backend = ScriptedBackend::new().with_script(Script::chunked(NOISY_RESPONSE, 3));

    let report = session.start("run project", &backend).await.unwrap();

    assert_eq!(child_labels(&session), vec!["plan {phase 1}", "execute"]);
    assert_eq!(report.malformed, 3);
    assert_close(&report.weights, &[0.5, 0.5]);
}

#[tokio::test]
async fn unframed_response_is_malformed() {
    let session = session();
    let backend = ScriptedBackend::new().with_script(Script::chunked(NO_MARKER_RESPONSE, 4));

    assert!(matches!(
        session.start("research", &backend).await,
        Err(SessionError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn unavailable_backend_leaves_node_decomposable() {
    let session = session();
    let err = session.start("ship", &FailingBackend).await.unwrap_err();
    assert!(err.is_retryable());

    let root = session.snapshot().root().map(DecompositionNode::id).unwrap();
    let backend = ScriptedBackend::new().with_script(Script::chunked(OVERWEIGHT_RESPONSE, 9));
    session.decompose(root, &backend).await.unwrap();
    assert_eq!(child_labels(&session).len(), 3);
}

#[tokio::test]
async fn nested_decomposition_and_queries() {
    let session = session();
    let backend = ScriptedBackend::new()
        .with_script(Script::chunked(OVERWEIGHT_RESPONSE, 5))
        .with_script(Script::chunked(
            &workflow_response(&[("wireframes", 0.5), ("review", 0.25)]),
            5,
        ));

    let top = session.start("ship", &backend).await.unwrap();
    let design = top.children[0];
    let nested = session.decompose(design, &backend).await.unwrap();
    assert_close(&nested.weights, &[2.0 / 3.0, 1.0 / 3.0]);

    let wireframes = nested.children[0];
    let lineage = session.lineage(wireframes).unwrap();
    assert_eq!(lineage.ancestors, vec![top.node_id, design]);
    assert_eq!(lineage.siblings, vec![nested.children[1]]);
    assert!(session.descendants(design).unwrap().contains(&wireframes));

    let requests = backend.requests();
    assert_eq!(requests[1].text, "design");
    assert!(requests[1].outline.contains("▶ design"));
}

#[tokio::test]
async fn test_cases_from_single_char_stream() {
    let session = session();
    let backend =
        ScriptedBackend::new().with_script(Script::fragments(single_chars(TEST_CASE_RESPONSE)));

    let report = session.generate_test_cases("login form", &backend).await.unwrap();

    assert_eq!(report.cases.len(), 2);
    assert_eq!(report.cases[1].id, "TC-002");
    let topics: Vec<_> = report.mind_map.children.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(topics, ["Valid login", "Password at max length"]);
    assert_eq!(report.mind_map.children[1].markers, vec!["priority-p2", "boundary"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_chunk_size_does_not_change_the_tree(size in 1usize..40) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (labels, weights) = runtime.block_on(async {
            let session = session();
            let backend = ScriptedBackend::new()
                .with_script(Script::fragments(chunk_text(OVERWEIGHT_RESPONSE, size)));
            let report = session.start("ship", &backend).await.unwrap();
            (child_labels(&session), report.weights)
        });

        prop_assert_eq!(labels, vec!["design", "build", "test"]);
        let sum: f64 = weights.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-9);
    }
}
