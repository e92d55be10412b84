//! Error types for the stream layer
//!
//! Provides error handling for:
//! - Weight normalization (empty or non-positive batches)
//! - Full-document payload parsing (test-case variant)
//!
//! Record-level malformation is deliberately absent here: a bad record is a
//! value ([`crate::record::RecordCandidate::Malformed`]), never an error.

/// Errors during ratio normalization
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    /// No records to normalize
    #[error("cannot normalize an empty record batch")]
    Empty,

    /// Weights sum to zero, a negative value, or a non-finite value
    #[error("record weights sum to {0}, expected a positive finite total")]
    NonPositiveSum(f64),
}

/// Errors while parsing a complete payload document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Payload was empty or whitespace only
    #[error("payload is empty")]
    EmptyPayload,

    /// Payload is not valid JSON
    #[error("payload syntax error: {0}")]
    Syntax(#[source] serde_json::Error),

    /// Payload is JSON but not in an accepted shape
    #[error("unexpected payload shape: {0}")]
    UnexpectedShape(String),
}

/// Result type alias for normalization
pub type NormalizeResult<T> = Result<T, NormalizeError>;
