//! Result and error types for tree-probe.
//!
//! Query errors carry literal messages that tests assert on:
//! `"No instances found"` and `"Expected 1 but found N"`.

use thiserror::Error;

/// Result type for tree-probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while rendering, querying or snapshotting a tree
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A `get*` query matched zero nodes
    #[error("No instances found")]
    NotFound {
        /// Description of the matcher that found nothing
        matcher: String,
    },

    /// A singular query matched more than one node
    #[error("Expected 1 but found {count}")]
    Ambiguous {
        /// Number of matching nodes
        count: usize,
        /// Description of the matcher
        matcher: String,
    },

    /// A matcher argument is malformed
    #[error("Invalid matcher: {message}")]
    InvalidMatcher {
        /// Error message
        message: String,
    },

    /// Operation called in the wrong lifecycle state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// State updates kept scheduling more updates
    #[error("Maximum update depth exceeded: more than {limit} flush passes")]
    UpdateDepthExceeded {
        /// Configured pass limit
        limit: usize,
    },

    /// Serialized tree differs from the stored snapshot
    #[error("Snapshot mismatch: {name}\n{diff}")]
    SnapshotMismatch {
        /// Snapshot name
        name: String,
        /// Line diff between expected and actual
        diff: String,
    },

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot serialization failed: {message}")]
    SnapshotSerialization {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProbeError {
    /// Whether this is a `NotFound` error
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this is an `Ambiguous` error
    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous { .. })
    }
}
