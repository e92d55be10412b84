//! Property tests for the stream layer
//!
//! Run with: cargo test --package flowsplit-stream --test stream_props

use flowsplit_stream::{decompose_stream, normalize, FrameMarkers, StreamRecord, StreamSummary};
use futures::executor::block_on;
use futures::stream;
use proptest::prelude::*;

const GARBAGE: &[&str] = &[
    r#"{"text":42,"ratio":0.5}"#,
    r#"{"ratio":0.3}"#,
    r#"{not json}"#,
    r#"{"text":"neg","ratio":-1}"#,
    r#"{"text":"","ratio":0.2}"#,
    r#""stray string""#,
    r#"{"text":"broken","#,
    r#"{"text":"cut off","ratio""#,
];

fn record_strategy() -> impl Strategy<Value = StreamRecord> {
    ("[a-zA-Z0-9][a-zA-Z0-9 {}\\[\\]\"]{0,11}", 0.01f64..1.0)
        .prop_map(|(text, ratio)| StreamRecord::new(text, ratio))
}

/// Payload items: `Ok` = valid record, `Err` = index into GARBAGE
fn items_strategy() -> impl Strategy<Value = Vec<Result<StreamRecord, usize>>> {
    proptest::collection::vec(
        prop_oneof![
            3 => record_strategy().prop_map(Ok),
            1 => (0..GARBAGE.len()).prop_map(Err),
        ],
        0..12,
    )
}

fn render(items: &[Result<StreamRecord, usize>]) -> String {
    let body: Vec<String> = items
        .iter()
        .map(|item| match item {
            Ok(record) => serde_json::to_string(record).unwrap(),
            Err(idx) => GARBAGE[*idx].to_string(),
        })
        .collect();
    format!(
        "Here is the decomposition you asked for.\n```json\n[\n  {}\n]\n```\nAnything else?",
        body.join(",\n  ")
    )
}

fn chunk(text: &str, sizes: &[usize]) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut pos = 0;
    let mut i = 0;
    while pos < chars.len() {
        let size = sizes.get(i % sizes.len().max(1)).copied().unwrap_or(1).max(1);
        let end = (pos + size).min(chars.len());
        out.push(chars[pos..end].iter().collect());
        pos = end;
        i += 1;
    }
    out
}

fn parse_summary(fragments: Vec<String>) -> StreamSummary {
    let source = stream::iter(fragments.into_iter().map(Ok::<_, std::io::Error>));
    block_on(decompose_stream(source, FrameMarkers::default(), |_| {})).unwrap()
}

fn parse(fragments: Vec<String>) -> Vec<StreamRecord> {
    parse_summary(fragments).records
}

proptest! {
    #[test]
    fn prop_emits_exactly_the_valid_records_in_order(items in items_strategy()) {
        let expected: Vec<&StreamRecord> = items.iter().filter_map(|i| i.as_ref().ok()).collect();
        let candidates = items
            .iter()
            .filter(|i| matches!(i, Err(idx) if GARBAGE[*idx].starts_with('{')))
            .count();
        let summary = parse_summary(vec![render(&items)]);
        let records = summary.records;

        prop_assert_eq!(summary.malformed, candidates);
        prop_assert_eq!(records.len(), expected.len());
        for (got, want) in records.iter().zip(expected) {
            prop_assert_eq!(&got.text, &want.text);
            prop_assert!((got.ratio - want.ratio).abs() < 1e-12);
        }
    }

    #[test]
    fn prop_chunk_boundaries_do_not_matter(
        items in items_strategy(),
        sizes in proptest::collection::vec(1usize..9, 1..6),
    ) {
        let text = render(&items);
        let whole = parse(vec![text.clone()]);
        let single_chars = parse(chunk(&text, &[1]));
        let random = parse(chunk(&text, &sizes));

        prop_assert_eq!(&whole, &single_chars);
        prop_assert_eq!(&whole, &random);
    }

    #[test]
    fn prop_normalized_weights_sum_to_one(
        ratios in proptest::collection::vec(0.001f64..10.0, 1..20)
    ) {
        let records: Vec<_> = ratios
            .iter()
            .enumerate()
            .map(|(i, r)| StreamRecord::new(format!("item {i}"), *r))
            .collect();
        let normalized = normalize(&records).unwrap();
        let weights = normalized.weights();

        let sum: f64 = weights.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-6);

        for i in 0..weights.len() {
            for j in 0..weights.len() {
                let before = ratios[i] / ratios[j];
                let after = weights[i] / weights[j];
                prop_assert!((before - after).abs() <= 1e-9 * before.max(1.0));
            }
        }
    }
}

#[test]
fn scenario_overweight_batch() {
    let text = "```json\n[{\"text\":\"design\",\"ratio\":0.4},{\"text\":\"build\",\"ratio\":0.5},{\"text\":\"test\",\"ratio\":0.3}]\n```";
    let records = parse(vec![text.to_string()]);

    let raw: Vec<f64> = records.iter().map(|r| r.ratio).collect();
    assert_eq!(raw, vec![0.4, 0.5, 0.3]);

    let weights = normalize(&records).unwrap().weights();
    let expected = [1.0 / 3.0, 5.0 / 12.0, 0.25];
    for (w, e) in weights.iter().zip(expected) {
        assert!((w - e).abs() < 1e-9, "{w} vs {e}");
    }
}

#[test]
fn scenario_opening_marker_split() {
    let fragments = vec![
        "Sure! ```js".to_string(),
        "on\n[{\"text\":\"design\",\"ratio\":1}]\n```".to_string(),
    ];
    let records = parse(fragments);
    assert_eq!(records, vec![StreamRecord::new("design", 1.0)]);
}
