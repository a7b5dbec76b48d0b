//! Reconciliation of merge groups and parallel edges.

pub mod edge;
pub mod property;

pub use edge::{
    assign_edge_ids, collapses, group_edges, identity_properties, perspective_properties, reconcile_edge_group,
    EdgeKey, EdgeMember,
};
pub use property::{reconcile_group, union_identifiers, ClaimSet, Member, ReconciledNode, Resolution};
