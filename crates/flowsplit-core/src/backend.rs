//! Model backend seam
//!
//! A backend turns a [`DecompositionRequest`] into a stream of raw text
//! fragments. Prompting, HTTP framing and vendor specifics all live behind
//! this trait; the session only sees fragments.

use crate::error::BackendError;
use crate::types::DecompositionRequest;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Stream of raw model output fragments
pub type FragmentStream = BoxStream<'static, Result<String, BackendError>>;

/// Source of model output
///
/// Implement this trait to connect a session to a model.
#[async_trait::async_trait]
pub trait DecompositionBackend: Send + Sync {
    /// Start a response for `request`
    async fn open(&self, request: &DecompositionRequest) -> Result<FragmentStream, BackendError>;
}

/// Split text into fragments of at most `size` characters
///
/// A size of 0 yields the whole text as one fragment.
#[must_use]
pub fn split_fragments(text: &str, size: usize) -> Vec<String> {
    if size == 0 || text.is_empty() {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// Backend that replays recorded responses in order
///
/// Each `open` consumes the next transcript and streams it in fixed-size
/// character fragments. Requests are recorded for inspection.
#[derive(Debug, Default)]
pub struct ReplayBackend {
    transcripts: Mutex<VecDeque<String>>,
    chunk_size: usize,
    requests: Mutex<Vec<DecompositionRequest>>,
}

impl ReplayBackend {
    /// Create empty replay backend
    #[inline]
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            ..Self::default()
        }
    }

    /// With another recorded response
    #[inline]
    #[must_use]
    pub fn with_transcript(self, transcript: impl Into<String>) -> Self {
        self.push(transcript);
        self
    }

    /// Queue another recorded response
    pub fn push(&self, transcript: impl Into<String>) {
        self.transcripts.lock().push_back(transcript.into());
    }

    /// Responses not yet replayed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.transcripts.lock().len()
    }

    /// Requests seen so far
    #[must_use]
    pub fn requests(&self) -> Vec<DecompositionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl DecompositionBackend for ReplayBackend {
    async fn open(&self, request: &DecompositionRequest) -> Result<FragmentStream, BackendError> {
        self.requests.lock().push(request.clone());
        let transcript = self
            .transcripts
            .lock()
            .pop_front()
            .ok_or(BackendError::Exhausted)?;

        tracing::debug!(
            kind = ?request.kind,
            bytes = transcript.len(),
            "replaying recorded response"
        );
        let fragments = split_fragments(&transcript, self.chunk_size);
        Ok(stream::iter(fragments.into_iter().map(Ok)).boxed())
    }
}
