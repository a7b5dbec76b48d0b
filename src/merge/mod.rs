//! Merge orchestration.
//!
//! [`Merger::merge`] runs the whole pipeline: validation, identity links,
//! union-find grouping, property and edge reconciliation, id assignment and
//! metadata. Per-group work can fan out over a scoped worker pool.

pub mod config;
pub mod metadata;
pub mod parallel;
pub mod pipeline;

pub use config::MergeConfig;
pub use metadata::{Advisory, AppliedEquivalence, ConflictEntry, ElementRef, GroupSummary, MergeMetadata, MergeOutput, Origin};
pub use pipeline::{merge, Merger};
