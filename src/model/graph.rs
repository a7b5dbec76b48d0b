//! The graph exchange structure and its file-level metadata.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::edge::Edge;
use super::node::Node;
use super::types::DisclosureScope;
use crate::boundary::FileSalt;
use crate::error::MergeResult;

/// File-level metadata of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphMeta {
    /// Labels identifying the file(s) this graph was built from. Merging
    /// takes the union.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub sources: BTreeSet<String>,

    /// Organizations whose perspective the graph represents.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub reporting_entities: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclosure_scope: Option<DisclosureScope>,

    /// Salt used for the boundary references in this graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<FileSalt>,
}

impl GraphMeta {
    /// The single reporting entity, if the sources agree on one.
    #[must_use]
    pub fn reporting_entity(&self) -> Option<&str> {
        let mut iter = self.reporting_entities.iter();
        match (iter.next(), iter.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    /// Human-readable label for diagnostics.
    #[must_use]
    pub fn source_label(&self) -> String {
        if self.sources.is_empty() {
            return "<unlabelled>".to_string();
        }
        self.sources.iter().cloned().collect::<Vec<_>>().join("+")
    }
}

/// A node/edge graph with file-level metadata.
///
/// # Examples
///
/// ```
/// use netmerge::{Edge, EdgeType, Graph, Node, NodeType};
///
/// let graph = Graph::new("supplier-a")
///     .with_node(Node::new("a1", NodeType::Organization))
///     .with_node(Node::new("a2", NodeType::Facility))
///     .with_edge(Edge::new("e1", EdgeType::Operates, "a1", "a2"));
/// assert_eq!(graph.meta.source_label(), "supplier-a");
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub meta: GraphMeta,

    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Creates an empty graph attributed to one source.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let mut graph = Self::default();
        graph.meta.sources.insert(source.into());
        graph
    }

    /// The empty graph, identity element of merge.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    #[must_use]
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    #[must_use]
    pub fn with_reporting_entity(mut self, entity: impl Into<String>) -> Self {
        self.meta.reporting_entities.insert(entity.into());
        self
    }

    #[must_use]
    pub const fn with_disclosure_scope(mut self, scope: DisclosureScope) -> Self {
        self.meta.disclosure_scope = Some(scope);
        self
    }

    #[must_use]
    pub fn with_salt(mut self, salt: FileSalt) -> Self {
        self.meta.salt = Some(salt);
        self
    }

    /// True when the graph has no nodes and no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id.as_str() == id)
    }

    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id.as_str() == id)
    }

    /// Serialized form. Merged graphs are fully ordered, so two merged graphs
    /// are equal exactly when their canonical JSON is.
    ///
    /// # Errors
    ///
    /// Returns `MergeError::Serialization` if serialization fails.
    pub fn canonical_json(&self) -> MergeResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
