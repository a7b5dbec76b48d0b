//! Error types for netmerge.
//!
//! Fatal conditions are strongly typed using thiserror. Non-fatal findings
//! (property conflicts, advisories) are not errors; they travel in the merge
//! metadata instead.

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{EdgeId, NodeId};

/// Structural defects in a single input graph.
///
/// These are fatal to the input and are reported before any merge work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("Graph carries {nodes} node(s) and {edges} edge(s) but no source label")]
    MissingSourceLabel {
        nodes: usize,
        edges: usize,
    },

    #[error("[{source_label}] Node id cannot be empty")]
    EmptyNodeId {
        source_label: String,
    },

    #[error("[{source_label}] Edge id cannot be empty")]
    EmptyEdgeId {
        source_label: String,
    },

    #[error("[{source_label}] Duplicate node id '{id}'")]
    DuplicateNodeId {
        source_label: String,
        id: NodeId,
    },

    #[error("[{source_label}] Duplicate edge id '{id}'")]
    DuplicateEdgeId {
        source_label: String,
        id: EdgeId,
    },

    #[error("[{source_label}] Edge '{edge}' references missing node '{endpoint}'")]
    DanglingEndpoint {
        source_label: String,
        edge: EdgeId,
        endpoint: NodeId,
    },

    #[error("[{source_label}] Node '{node}' has an identifier with an empty scheme or value")]
    EmptyIdentifier {
        source_label: String,
        node: NodeId,
    },

    #[error("[{source_label}] '{element}' has an invalid validity window: {from} is after {to}")]
    InvalidValidity {
        source_label: String,
        element: String,
        from: NaiveDate,
        to: NaiveDate,
    },
}

/// Resource-limit violations, checked before the working set is allocated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitError {
    #[error("[{source_label}] {actual} nodes exceeds the limit of {max}")]
    TooManyNodes {
        source_label: String,
        max: usize,
        actual: usize,
    },

    #[error("[{source_label}] {actual} edges exceeds the limit of {max}")]
    TooManyEdges {
        source_label: String,
        max: usize,
        actual: usize,
    },

    #[error("{actual} nodes across all inputs exceeds the limit of {max}")]
    TooManyTotalNodes {
        max: usize,
        actual: usize,
    },

    #[error("[{source_label}] Node '{node}' carries {actual} identifiers, limit is {max}")]
    TooManyIdentifiers {
        source_label: String,
        node: NodeId,
        max: usize,
        actual: usize,
    },

    #[error("[{source_label}] '{element}' property '{property}' nests deeper than {max}")]
    NestingTooDeep {
        source_label: String,
        element: String,
        property: String,
        max: usize,
    },
}

/// Invalid merge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Config field '{field}' must be greater than zero")]
    ZeroValue {
        field: &'static str,
    },

    #[error("Maximum nesting depth {max_depth} exceeds the hard ceiling of {ceiling}")]
    DepthAboveCeiling {
        max_depth: usize,
        ceiling: usize,
    },
}

/// Malformed file salt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaltError {
    #[error("Salt is not valid hex: {reason}")]
    InvalidHex {
        reason: String,
    },

    #[error("Salt must be {expected} bytes, got {actual}")]
    InvalidLength {
        expected: usize,
        actual: usize,
    },
}

/// Top-level error type for netmerge.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Input '{source_label}' has {} structural error(s)", .errors.len())]
    InvalidInput {
        source_label: String,
        errors: Vec<StructuralError>,
    },

    #[error("Resource limit exceeded: {0}")]
    Limit(#[from] LimitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Salt error: {0}")]
    Salt(#[from] SaltError),

    #[error("Serialization failed: {message}")]
    Serialization {
        message: String,
    },

    #[error("Worker pool failed: {message}")]
    WorkerPool {
        message: String,
    },

    #[error("Merged graph violates an invariant: {message}")]
    InvariantViolation {
        message: String,
    },
}

impl MergeError {
    /// Creates an invariant violation error.
    #[must_use]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Returns true if an input failed structural validation.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }

    /// Returns true if a resource limit was exceeded.
    #[must_use]
    pub const fn is_limit(&self) -> bool {
        matches!(self, Self::Limit(_))
    }

    /// Returns true if the configuration was rejected.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this error indicates a bug rather than bad input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Serialization { .. } | Self::WorkerPool { .. } | Self::InvariantViolation { .. }
        )
    }

    /// Structural errors carried by an `InvalidInput` error.
    #[must_use]
    pub fn structural_errors(&self) -> &[StructuralError] {
        match self {
            Self::InvalidInput { errors, .. } => errors,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for MergeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for netmerge operations.
pub type MergeResult<T> = Result<T, MergeError>;
