//! # netmerge - multi-party supply-chain graph merging
//!
//! netmerge combines supply-chain graphs published by independent parties
//! into one graph. Nodes that share a globally meaningful identifier (LEI,
//! DUNS, GLN, national registry numbers) collapse into one entity; their
//! properties are reconciled with per-property provenance, and every
//! disagreement is kept as an explicit conflict instead of being resolved by
//! guesswork.
//!
//! ## Core Concepts
//!
//! - **Graph**: nodes, edges and file metadata from one or more sources
//! - **Identifier**: a scheme/value record, optionally scoped by authority
//!   and validity window, used to decide entity identity
//! - **Merge group**: the connected component of nodes linked by shared
//!   identifiers or equivalence assertions
//! - **Conflict**: a property whose sources disagree, with every value and
//!   the sources that asserted it
//! - **Boundary reference**: an opaque salted stand-in for an entity that is
//!   withheld from a disclosure-scoped view
//!
//! The merge is commutative, associative and idempotent over its inputs:
//! the result depends only on which graphs are merged, never on order or
//! grouping.
//!
//! ## Usage
//!
//! ```rust
//! use netmerge::{merge, Edge, EdgeType, Graph, Identifier, Node, NodeType};
//!
//! let buyer = Graph::new("buyer")
//!     .with_reporting_entity("buyer")
//!     .with_node(Node::new("me", NodeType::Organization))
//!     .with_node(
//!         Node::new("mill", NodeType::Organization)
//!             .with_identifier(Identifier::new("duns", "123456789"))
//!             .with_property("name", "Northern Steel"),
//!     )
//!     .with_edge(Edge::new("e1", EdgeType::Supplies, "mill", "me").with_property("tier", 1));
//!
//! let auditor = Graph::new("auditor").with_node(
//!     Node::new("site-4", NodeType::Organization)
//!         .with_identifier(Identifier::new("duns", "123456789"))
//!         .with_property("name", "Northern Steel Ltd"),
//! );
//!
//! let output = merge(&[buyer, auditor])?;
//! assert_eq!(output.graph.nodes.len(), 2);
//! assert_eq!(output.metadata.conflicts.len(), 1);
//! # Ok::<(), netmerge::MergeError>(())
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod error;
pub mod model;
pub mod time;
pub mod value;

// Identity
pub mod canonical;
pub mod identity;
pub mod scheme;
pub mod union_find;

// Merge stages
pub mod boundary;
pub mod merge;
pub mod reconcile;
pub mod validation;

// Re-export primary types at crate root for convenience
pub use boundary::{redact, BoundaryRefGenerator, FileSalt, RedactionPolicy};
pub use error::{ConfigError, LimitError, MergeError, MergeResult, SaltError, StructuralError};
pub use identity::{EquivalenceConfidence, MatchOutcome};
pub use merge::{merge, Advisory, MergeConfig, MergeMetadata, MergeOutput, Merger};
pub use model::{
    ConflictValue, DisclosureScope, Edge, EdgeId, EdgeType, Graph, GraphMeta, Identifier, Label, Node, NodeId,
    NodeType, PerspectiveValue, PropertyConflict, PropertyPath, Provenance, Sensitivity, VerificationStatus,
};
pub use scheme::{MatchScope, SchemeRegistry, SchemeSpec};
pub use time::ValidityWindow;
pub use union_find::UnionFind;
pub use validation::InputLimits;
pub use value::Value;
