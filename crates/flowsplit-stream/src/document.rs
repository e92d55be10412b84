//! Test-case payload documents
//!
//! Test-case generation shares the frame extraction step but parses the whole
//! payload at once. Models return either a bare array of cases or an object
//! wrapping them in `topics`; both are accepted.

use crate::error::DocumentError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    /// Functional behavior
    Functional,
    /// Boundary and edge conditions
    Boundary,
    /// Performance characteristics
    Performance,
}

impl TestKind {
    /// Lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Functional => "functional",
            Self::Boundary => "boundary",
            Self::Performance => "performance",
        }
    }
}

/// Test case priority, P0 most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Must pass before anything ships
    P0,
    /// Important
    P1,
    /// Nice to have
    P2,
}

impl Priority {
    /// Lowercase marker form, e.g. `p0`
    #[inline]
    #[must_use]
    pub fn as_marker(self) -> &'static str {
        match self {
            Self::P0 => "p0",
            Self::P1 => "p1",
            Self::P2 => "p2",
        }
    }
}

/// One generated test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Model-assigned identifier
    pub id: String,
    /// Short title
    pub title: String,
    /// What the case covers
    pub description: String,
    /// Ordered steps
    pub steps: Vec<String>,
    /// Expected results, in step order
    pub expected_results: Vec<String>,
    /// Case kind
    #[serde(rename = "type")]
    pub kind: TestKind,
    /// Priority
    pub priority: Priority,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TestCaseDocument {
    Bare(Vec<TestCase>),
    Wrapped { topics: Vec<TestCase> },
}

/// Parse a complete test-case payload
///
/// # Errors
/// - `DocumentError::EmptyPayload` for blank input
/// - `DocumentError::Syntax` if the payload is not JSON
/// - `DocumentError::UnexpectedShape` if it is JSON of the wrong shape
pub fn parse_test_cases(payload: &str) -> Result<Vec<TestCase>, DocumentError> {
    if payload.trim().is_empty() {
        return Err(DocumentError::EmptyPayload);
    }

    let value: Value = serde_json::from_str(payload.trim()).map_err(DocumentError::Syntax)?;
    let document: TestCaseDocument = serde_json::from_value(value)
        .map_err(|e| DocumentError::UnexpectedShape(e.to_string()))?;

    Ok(match document {
        TestCaseDocument::Bare(cases) | TestCaseDocument::Wrapped { topics: cases } => cases,
    })
}
