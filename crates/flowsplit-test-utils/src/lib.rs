//! Testing utilities for the flowsplit workspace
//!
//! Shared backends, chunkers, and fixtures.

#![allow(missing_docs)]

use flowsplit_core::{BackendError, DecompositionBackend, DecompositionRequest, FragmentStream};
use flowsplit_tree::{DecompositionNode, DecompositionTree, NodeId};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

pub mod fixtures {
    //! Recorded model responses

    /// Three records summing to 1.2
    pub const OVERWEIGHT_RESPONSE: &str = "Sure! Here is the breakdown:\n```json\n[\n  {\"text\": \"design\", \"ratio\": 0.4},\n  {\"text\": \"build\", \"ratio\": 0.5},\n  {\"text\": \"test\", \"ratio\": 0.3}\n]\n```\nLet me know if you need more detail.";

    /// Closing marker and array bracket never arrive
    pub const UNTERMINATED_RESPONSE: &str =
        "```json\n[{\"text\": \"research\", \"ratio\": 0.6}, {\"text\": \"write\", \"ratio\": 0.4}";

    /// Bare JSON, no frame
    pub const NO_MARKER_RESPONSE: &str = "[{\"text\": \"research\", \"ratio\": 1.0}]";

    /// Valid records interleaved with garbage candidates
    pub const NOISY_RESPONSE: &str = "```json\n[\n  {\"text\": \"plan {phase 1}\", \"ratio\": 0.5},\n  {\"text\": 7, \"ratio\": 0.2},\n  {broken},\n  {\"ratio\": 0.1},\n  {\"text\": \"execute\", \"ratio\": 0.5}\n]\n```";

    /// Test-case document wrapped in `topics`
    pub const TEST_CASE_RESPONSE: &str = r#"Here are the cases:
```json
{
  "topics": [
    {
      "id": "TC-001",
      "title": "Valid login",
      "description": "User logs in with valid credentials",
      "steps": ["Open the login page", "Enter valid credentials", "Submit"],
      "expectedResults": ["Dashboard is displayed"],
      "type": "functional",
      "priority": "P0"
    },
    {
      "id": "TC-002",
      "title": "Password at max length",
      "description": "Password of exactly 64 characters",
      "steps": ["Enter a 64 character password", "Submit"],
      "expectedResults": ["Login succeeds"],
      "type": "boundary",
      "priority": "P2"
    }
  ]
}
```"#;

    /// Framed workflow response for the given records
    #[must_use]
    pub fn workflow_response(items: &[(&str, f64)]) -> String {
        let body: Vec<String> = items
            .iter()
            .map(|(text, ratio)| format!("{{\"text\": {text:?}, \"ratio\": {ratio}}}"))
            .collect();
        format!("```json\n[{}]\n```", body.join(", "))
    }
}

/// Split text into fragments of at most `size` characters
#[must_use]
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    flowsplit_core::split_fragments(text, size)
}

/// One fragment per character
#[must_use]
pub fn single_chars(text: &str) -> Vec<String> {
    text.chars().map(String::from).collect()
}

/// Two fragments split `offset` bytes into the first occurrence of `marker`
///
/// # Panics
/// If `marker` is absent or the split is not on a char boundary.
#[must_use]
pub fn split_inside(text: &str, marker: &str, offset: usize) -> Vec<String> {
    let at = text.find(marker).expect("marker present") + offset;
    vec![text[..at].to_string(), text[at..].to_string()]
}

/// One scripted response
#[derive(Debug, Clone, Default)]
pub struct Script {
    fragments: Vec<Result<String, BackendError>>,
}

impl Script {
    /// Response made of the given fragments
    #[must_use]
    pub fn fragments(fragments: Vec<String>) -> Self {
        Self {
            fragments: fragments.into_iter().map(Ok).collect(),
        }
    }

    /// Response text chunked into `size`-character fragments
    #[must_use]
    pub fn chunked(text: &str, size: usize) -> Self {
        Self::fragments(chunk_text(text, size))
    }

    /// Keep the first `n` fragments, then fail with a transport error
    #[must_use]
    pub fn fail_after(mut self, n: usize, message: &str) -> Self {
        self.fragments.truncate(n);
        self.fragments
            .push(Err(BackendError::Transport(message.to_string())));
        self
    }
}

/// Backend that plays scripted responses in order
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<DecompositionRequest>>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_script(self, script: Script) -> Self {
        self.scripts.lock().push_back(script);
        self
    }

    #[must_use]
    pub fn requests(&self) -> Vec<DecompositionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl DecompositionBackend for ScriptedBackend {
    async fn open(&self, request: &DecompositionRequest) -> Result<FragmentStream, BackendError> {
        self.requests.lock().push(request.clone());
        let script = self.scripts.lock().pop_front().ok_or(BackendError::Exhausted)?;
        Ok(stream::iter(script.fragments).boxed())
    }
}

/// Backend that cannot open a stream
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingBackend;

#[async_trait::async_trait]
impl DecompositionBackend for FailingBackend {
    async fn open(&self, _: &DecompositionRequest) -> Result<FragmentStream, BackendError> {
        Err(BackendError::Unavailable("connection refused".to_string()))
    }
}

/// Backend that streams `head`, then waits for [`GatedBackend::release`]
/// before streaming `tail`
#[derive(Debug)]
pub struct GatedBackend {
    head: Vec<String>,
    tail: Vec<String>,
    gate: Arc<Notify>,
}

impl GatedBackend {
    #[must_use]
    pub fn new(head: Vec<String>, tail: Vec<String>) -> Self {
        Self {
            head,
            tail,
            gate: Arc::new(Notify::new()),
        }
    }

    /// Let the tail through
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait::async_trait]
impl DecompositionBackend for GatedBackend {
    async fn open(&self, _: &DecompositionRequest) -> Result<FragmentStream, BackendError> {
        let gate = Arc::clone(&self.gate);
        let tail = self.tail.clone();
        let head = stream::iter(self.head.clone().into_iter().map(Ok));
        let tail = stream::once(async move {
            gate.notified().await;
            stream::iter(tail.into_iter().map(Ok))
        })
        .flatten();
        Ok(head.chain(tail).boxed())
    }
}

/// Ids in [`sample_tree`]
#[derive(Debug, Clone, Copy)]
pub struct SampleIds {
    pub root: NodeId,
    pub design: NodeId,
    pub build: NodeId,
    pub test: NodeId,
    pub sketch: NodeId,
}

/// ```text
/// ship feature
/// ├── design
/// │   └── sketch
/// ├── build
/// └── test
/// ```
#[must_use]
pub fn sample_tree() -> (DecompositionTree, SampleIds) {
    let mut tree = DecompositionTree::new();
    let root = tree.set_root(DecompositionNode::root("ship feature"));

    let design = DecompositionNode::child("design", 0.3);
    let build = DecompositionNode::child("build", 0.5);
    let test = DecompositionNode::child("test", 0.2);
    let ids = (design.id(), build.id(), test.id());
    tree.attach_children(root, vec![design, build, test]).unwrap();

    let sketch = DecompositionNode::child("sketch", 1.0);
    let sketch_id = sketch.id();
    tree.attach_children(ids.0, vec![sketch]).unwrap();

    (
        tree,
        SampleIds {
            root,
            design: ids.0,
            build: ids.1,
            test: ids.2,
            sketch: sketch_id,
        },
    )
}
