//! In-memory graph model shared by every merge stage.

mod arena;
mod edge;
mod graph;
mod identifier;
mod ids;
mod node;
mod provenance;
mod types;

pub use arena::{Arena, Handle};
pub use edge::Edge;
pub use graph::{Graph, GraphMeta};
pub use identifier::{Identifier, Label};
pub use ids::{EdgeId, NodeId};
pub use node::Node;
pub use provenance::{ConflictValue, PerspectiveValue, PropertyConflict, PropertyPath, Provenance};
pub use types::{DisclosureScope, EdgeType, NodeType, Sensitivity, VerificationStatus};
