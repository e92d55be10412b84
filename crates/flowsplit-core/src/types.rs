//! Core types for decomposition sessions
//!
//! Defines:
//! - Session configuration (TOML-loadable)
//! - Backend requests
//! - Tree update events
//! - Decomposition reports

use crate::error::{SessionError, SessionResult};
use flowsplit_stream::{Completion, FrameMarkers, FramingStatus, DEFAULT_TOLERANCE};
use flowsplit_tree::{LayoutConfig, NodeId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Payload frame markers
    pub frame: FrameMarkers,
    /// Distance from 1 at which a batch sum counts as adjusted
    pub normalize_tolerance: f64,
    /// Labels shorter than this are not decomposable
    pub min_label_chars: usize,
    /// Delay before `is_new` flags are cleared, in milliseconds
    pub new_flag_ttl_ms: u64,
    /// Layout geometry
    pub layout: LayoutConfig,
    /// Tree update channel capacity
    pub event_capacity: usize,
}

impl SessionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With frame markers
    #[inline]
    #[must_use]
    pub fn with_frame(mut self, frame: FrameMarkers) -> Self {
        self.frame = frame;
        self
    }

    /// With normalization tolerance
    #[inline]
    #[must_use]
    pub fn with_normalize_tolerance(mut self, tolerance: f64) -> Self {
        self.normalize_tolerance = tolerance;
        self
    }

    /// With minimum decomposable label length
    #[inline]
    #[must_use]
    pub fn with_min_label_chars(mut self, chars: usize) -> Self {
        self.min_label_chars = chars;
        self
    }

    /// With `is_new` flag lifetime
    #[inline]
    #[must_use]
    pub fn with_new_flag_ttl(mut self, ttl: Duration) -> Self {
        self.new_flag_ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With layout geometry
    #[inline]
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// With update channel capacity
    #[inline]
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// `is_new` flag lifetime
    #[inline]
    #[must_use]
    pub fn new_flag_ttl(&self) -> Duration {
        Duration::from_millis(self.new_flag_ttl_ms)
    }

    /// Check field ranges
    ///
    /// # Errors
    /// `SessionError::Config` naming the first invalid field.
    pub fn validate(&self) -> SessionResult<()> {
        if !self.frame.is_valid() {
            return Err(SessionError::Config("frame markers must be non-empty".into()));
        }
        if !(self.normalize_tolerance.is_finite() && self.normalize_tolerance >= 0.0) {
            return Err(SessionError::Config(format!(
                "normalize_tolerance must be a non-negative number, got {}",
                self.normalize_tolerance
            )));
        }
        if self.event_capacity == 0 {
            return Err(SessionError::Config("event_capacity must be at least 1".into()));
        }
        let layout = &self.layout;
        if !(layout.node_width > 0.0 && layout.node_spacing >= 0.0 && layout.vertical_spacing > 0.0)
        {
            return Err(SessionError::Config(
                "layout widths and spacings must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate TOML
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    /// `SessionError::Config` on syntax or range errors.
    pub fn from_toml_str(text: &str) -> SessionResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// `SessionError::Config` if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame: FrameMarkers::default(),
            normalize_tolerance: DEFAULT_TOLERANCE,
            min_label_chars: 2,
            new_flag_ttl_ms: 500,
            layout: LayoutConfig::default(),
            event_capacity: 256,
        }
    }
}

/// What the backend is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// `{ text, ratio }` record array
    Workflow,
    /// Test-case document
    TestCases,
}

/// Request handed to a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecompositionRequest {
    /// Output kind
    pub kind: RequestKind,
    /// Text to decompose (node label or user input)
    pub text: String,
    /// Node being decomposed, for workflow requests
    pub node_id: Option<NodeId>,
    /// Current tree outline with the focus node marked
    pub outline: String,
}

impl DecompositionRequest {
    /// Workflow decomposition of a tree node
    #[must_use]
    pub fn workflow(text: impl Into<String>, node_id: NodeId, outline: impl Into<String>) -> Self {
        Self {
            kind: RequestKind::Workflow,
            text: text.into(),
            node_id: Some(node_id),
            outline: outline.into(),
        }
    }

    /// Test-case generation for free text
    #[must_use]
    pub fn test_cases(text: impl Into<String>) -> Self {
        Self {
            kind: RequestKind::TestCases,
            text: text.into(),
            node_id: None,
            outline: String::new(),
        }
    }
}

/// What changed in the tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateKind {
    /// Tree cleared
    Reset,
    /// New root installed
    RootSet {
        /// Root id
        root: NodeId,
    },
    /// A streamed child was attached
    ChildAttached {
        /// Node being decomposed
        parent: NodeId,
        /// The new child
        child: NodeId,
    },
    /// A finished batch was reweighted
    BatchNormalized {
        /// Node being decomposed
        parent: NodeId,
        /// Input sum was outside tolerance
        adjusted: bool,
    },
    /// `is_new` flags cleared
    FlagsCleared {
        /// Number of nodes affected
        count: usize,
    },
}

/// Tree change notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeUpdate {
    /// Tree revision after the change
    pub revision: u64,
    /// What changed
    pub kind: UpdateKind,
}

/// Outcome of one completed decomposition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecompositionReport {
    /// Decomposed node
    pub node_id: NodeId,
    /// New children, in order
    pub children: Vec<NodeId>,
    /// Normalized child weights, in order
    pub weights: Vec<f64>,
    /// Raw ratio sum before normalization
    pub original_sum: f64,
    /// Raw sum was outside tolerance
    pub adjusted: bool,
    /// Malformed candidates discarded
    pub malformed: usize,
    /// How the payload frame ended
    pub framing: FramingStatus,
    /// Why streaming stopped
    pub completion: Completion,
}
