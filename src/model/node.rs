//! Nodes: organizations, facilities, goods and the like.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::identifier::{Identifier, Label};
use super::ids::NodeId;
use super::provenance::{PropertyConflict, PropertyPath, Provenance};
use super::types::{NodeType, Sensitivity};
use crate::value::Value;

/// A graph node.
///
/// # Examples
///
/// ```
/// use netmerge::{Identifier, Node, NodeType};
///
/// let node = Node::new("a1", NodeType::Organization)
///     .with_identifier(Identifier::new("lei", "5493001KJTIIGC8Y1R12"))
///     .with_property("name", "Acme Metals");
/// assert_eq!(node.identifiers.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,

    /// Open extension values, reconciled key by key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Json>,

    /// Node-level sensitivity marker used by redaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Sensitivity>,

    #[serde(default, skip_serializing_if = "Provenance::is_empty")]
    pub provenance: Provenance,

    /// Unresolved values carried from earlier merges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<PropertyConflict>,
}

impl Node {
    /// Creates an empty node of the given type.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            node_type,
            identifiers: Vec::new(),
            labels: Vec::new(),
            properties: BTreeMap::new(),
            extensions: BTreeMap::new(),
            sensitivity: None,
            provenance: Provenance::new(),
            conflicts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_identifier(mut self, identifier: Identifier) -> Self {
        self.identifiers.push(identifier);
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: Json) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    #[must_use]
    pub const fn with_sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.sensitivity = Some(sensitivity);
        self
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Finds the carried conflict for a top-level property.
    #[must_use]
    pub fn conflict_for(&self, key: &str) -> Option<&PropertyConflict> {
        let path = PropertyPath::property(key);
        self.conflicts.iter().find(|c| c.path == path)
    }

    /// Node-level sensitivity: the explicit marker, else confidential for
    /// persons and public for everything else.
    #[must_use]
    pub fn effective_sensitivity(&self) -> Sensitivity {
        self.sensitivity.unwrap_or(match self.node_type {
            NodeType::Person => Sensitivity::Confidential,
            _ => Sensitivity::Public,
        })
    }
}
