//! Edges: typed, directed relationships between nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::ids::{EdgeId, NodeId};
use super::provenance::{PerspectiveValue, PropertyConflict, Provenance};
use super::types::EdgeType;
use crate::time::ValidityWindow;
use crate::value::Value;

/// A directed graph edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,

    #[serde(rename = "type")]
    pub edge_type: EdgeType,

    pub source: NodeId,
    pub target: NodeId,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Json>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<ValidityWindow>,

    /// Reporting-entity-relative values gathered from every source.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub perspectives: Vec<PerspectiveValue>,

    #[serde(default, skip_serializing_if = "Provenance::is_empty")]
    pub provenance: Provenance,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<PropertyConflict>,
}

impl Edge {
    #[must_use]
    pub fn new(
        id: impl Into<EdgeId>,
        edge_type: EdgeType,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            edge_type,
            source: source.into(),
            target: target.into(),
            properties: BTreeMap::new(),
            extensions: BTreeMap::new(),
            validity: None,
            perspectives: Vec::new(),
            provenance: Provenance::new(),
            conflicts: Vec::new(),
        }
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
    pub const fn with_validity(mut self, validity: ValidityWindow) -> Self {
        self.validity = Some(validity);
        self
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Perspective values recorded for one property.
    pub fn perspectives_for<'a>(&'a self, property: &'a str) -> impl Iterator<Item = &'a PerspectiveValue> + 'a {
        self.perspectives.iter().filter(move |p| p.property == property)
    }
}
