//! Test-case mind-map projection
//!
//! Generated test cases are shown as a mind map:
//!
//! ```text
//! Test cases
//! ├── <case title>            markers: priority-p0, functional
//! │   ├── Description         note: <description>
//! │   ├── Steps
//! │   │   └── <step> …
//! │   └── Expected results
//! │       └── <result> …
//! └── …
//! ```
//!
//! Topic ids are positional (`topic-0`, `steps-0`, `step-0-1`, …) so the
//! same cases always give the same map.

use flowsplit_stream::{FramingStatus, TestCase};
use serde::Serialize;

/// One mind-map topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicNode {
    /// Positional id
    pub id: String,
    /// Display title
    pub title: String,
    /// Marker tags
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<String>,
    /// Attached note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Sub-topics
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TopicNode>,
}

impl TopicNode {
    fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            markers: Vec::new(),
            note: None,
            children: Vec::new(),
        }
    }

    /// Render as an indented outline, one topic per line
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.title);
        if !self.markers.is_empty() {
            out.push_str(" [");
            out.push_str(&self.markers.join(", "));
            out.push(']');
        }
        if let Some(note) = &self.note {
            out.push_str(": ");
            out.push_str(note);
        }
        out.push('\n');
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}

/// Build the mind map for a set of cases
#[must_use]
pub fn mind_map(cases: &[TestCase]) -> TopicNode {
    let mut root = TopicNode::new("root", "Test cases");
    root.children = cases.iter().enumerate().map(|(i, case)| case_topic(i, case)).collect();
    root
}

fn case_topic(index: usize, case: &TestCase) -> TopicNode {
    let mut description = TopicNode::new(format!("desc-{index}"), "Description");
    description.note = Some(case.description.clone());

    let mut steps = TopicNode::new(format!("steps-{index}"), "Steps");
    steps.children = case
        .steps
        .iter()
        .enumerate()
        .map(|(j, step)| TopicNode::new(format!("step-{index}-{j}"), step.clone()))
        .collect();

    let mut results = TopicNode::new(format!("results-{index}"), "Expected results");
    results.children = case
        .expected_results
        .iter()
        .enumerate()
        .map(|(j, result)| TopicNode::new(format!("result-{index}-{j}"), result.clone()))
        .collect();

    let mut topic = TopicNode::new(format!("topic-{index}"), case.title.clone());
    topic.markers = vec![
        format!("priority-{}", case.priority.as_marker()),
        case.kind.as_str().to_string(),
    ];
    topic.children = vec![description, steps, results];
    topic
}

/// Outcome of one test-case generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCaseReport {
    /// Parsed cases, in document order
    pub cases: Vec<TestCase>,
    /// Mind-map projection of the cases
    pub mind_map: TopicNode,
    /// How the payload frame ended
    pub framing: FramingStatus,
}
