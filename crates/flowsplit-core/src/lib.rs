//! flowsplit core - decomposition sessions
//!
//! Drives streamed model output into a weighted task tree:
//! - Owns one tree per session (no global state)
//! - Streams records into the tree as they arrive
//! - Normalizes each finished batch
//! - Guards against double and concurrent decomposition of a node
//! - Broadcasts tree changes so renderers can re-run the layout
//!
//! # Example
//!
//! ```rust,ignore
//! use flowsplit_core::{DecompositionSession, ReplayBackend, SessionConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = DecompositionSession::new(SessionConfig::default())?;
//! let backend = ReplayBackend::new(16).with_transcript(recorded_response);
//!
//! let report = session.start("Launch the new onboarding flow", &backend).await?;
//! println!("{} children", report.children.len());
//! println!("{}", session.outline(None));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod backend;
pub mod decomposition;
pub mod error;
pub mod inflight;
pub mod session;
pub mod test_cases;
pub mod types;

// Re-exports for convenience
pub use backend::{split_fragments, DecompositionBackend, FragmentStream, ReplayBackend};
pub use decomposition::{check_decomposable, ChildBatch};
pub use error::{BackendError, SessionError, SessionResult};
pub use inflight::{InFlight, InFlightClaim};
pub use session::DecompositionSession;
pub use test_cases::{mind_map, TestCaseReport, TopicNode};
pub use types::{
    DecompositionReport, DecompositionRequest, RequestKind, SessionConfig, TreeUpdate, UpdateKind,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with sessions
    pub use crate::{
        BackendError, DecompositionBackend, DecompositionReport, DecompositionRequest,
        DecompositionSession, FragmentStream, SessionConfig, SessionError, TreeUpdate,
    };
    pub use flowsplit_tree::{HighlightSet, LayoutGraph, NodeId};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
