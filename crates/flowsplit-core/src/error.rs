//! Error types for decomposition sessions
//!
//! Mirrors the failure taxonomy of a decomposition:
//! - Transport failures from the backend
//! - Framing failures (no payload found)
//! - Normalization failures (nothing usable to weigh)
//! - Tree addressing failures
//! - Guard rejections (node already split, split in flight, label too short)
//!
//! Record-level malformation is not an error here; the stream layer drops
//! those candidates and counts them.

use flowsplit_stream::{DocumentError, NormalizeError};
use flowsplit_tree::{NodeId, TreeError};

/// Backend transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Stream read failed mid-response
    #[error("transport failed: {0}")]
    Transport(String),

    /// Backend could not open a response stream
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Replay backend has no responses left
    #[error("no recorded response left")]
    Exhausted,
}

/// Main session error type
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Backend transport failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Tree addressing failed
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    /// Batch could not be normalized
    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    /// Test-case payload did not parse
    #[error("test-case document invalid: {0}")]
    Document(#[from] DocumentError),

    /// Response carried no framed payload
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A decomposition of this node is still streaming
    #[error("decomposition already in flight for node {0}")]
    AlreadyDecomposing(NodeId),

    /// Node already has children
    #[error("node {0} is already decomposed")]
    AlreadyDecomposed(NodeId),

    /// Input or node label cannot be decomposed
    #[error("not decomposable: {0}")]
    NotDecomposable(String),

    /// Configuration invalid or unreadable
    #[error("configuration error: {0}")]
    Config(String),
}

impl SessionError {
    /// Check if a retry might succeed
    ///
    /// Transport and model-output problems are retryable; caller bugs and
    /// guard rejections are not.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Backend(BackendError::Transport(_) | BackendError::Unavailable(_))
                | Self::MalformedResponse(_)
                | Self::Normalize(_)
                | Self::Document(_)
        )
    }
}

/// Result type for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;
