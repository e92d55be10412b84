//! flowsplit stream layer
//!
//! The trusted boundary between a model's free-text output and the
//! structured records that populate a decomposition tree.
//!
//! # Core Operations
//!
//! - **Frame**: isolate the fenced payload from decorative text
//! - **Parse**: emit each `{ text, ratio }` record as soon as it is complete
//! - **Normalize**: rescale a finished batch so its ratios sum to 1
//!
//! # Architecture
//!
//! ```text
//! fragments → FrameExtractor → RecordParser → StreamRecord → callback
//!                                                  ↓ (batch done)
//!                                            RatioNormalizer
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use flowsplit_stream::{decompose_stream, normalize, FrameMarkers};
//!
//! # async fn example(fragments: impl futures::Stream<Item = Result<String, std::io::Error>> + Unpin)
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! let summary = decompose_stream(fragments, FrameMarkers::default(), |record| {
//!     println!("{} ({:.0}%)", record.text, record.ratio * 100.0);
//! })
//! .await?;
//!
//! let normalized = normalize(&summary.records)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod document;
pub mod error;
pub mod frame;
pub mod normalize;
pub mod record;
pub mod stream;

// Re-exports for convenience
pub use document::{parse_test_cases, Priority, TestCase, TestKind};
pub use error::{DocumentError, NormalizeError};
pub use frame::{FrameExtractor, FrameMarkers, FramingStatus};
pub use normalize::{normalize, Normalized, RatioNormalizer, DEFAULT_TOLERANCE};
pub use record::{MalformedReason, ParseEvent, RecordCandidate, RecordParser, StreamRecord};
pub use stream::{collect_payload, decompose_stream, Completion, RecordStream, StreamSummary};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the stream layer
    pub use crate::error::{DocumentError, NormalizeError};
    pub use crate::frame::{FrameMarkers, FramingStatus};
    pub use crate::normalize::RatioNormalizer;
    pub use crate::record::StreamRecord;
    pub use crate::stream::{decompose_stream, StreamSummary};
}
