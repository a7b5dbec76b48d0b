//! Per-input structural validation and resource limits.
//!
//! Both run before any merge work. Limit checks stop at the first breach;
//! structural checks collect every defect of a graph so callers can report
//! them together.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::{ConfigError, LimitError, StructuralError};
use crate::model::{Graph, Node, PropertyConflict};
use crate::value::Value;

/// Hard ceiling on the configurable nesting depth.
pub const MAX_DEPTH_CEILING: usize = 128;

/// Per-input and aggregate size limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputLimits {
    pub max_nodes_per_input: usize,
    pub max_edges_per_input: usize,
    pub max_total_nodes: usize,
    pub max_identifiers_per_node: usize,
    /// Maximum nesting depth of structured property values.
    pub max_depth: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_nodes_per_input: 1_000_000,
            max_edges_per_input: 5_000_000,
            max_total_nodes: 10_000_000,
            max_identifiers_per_node: 1024,
            max_depth: 32,
        }
    }
}

impl InputLimits {
    /// Validates the limits themselves.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for zero limits or a depth above
    /// [`MAX_DEPTH_CEILING`].
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nodes_per_input == 0 {
            return Err(ConfigError::ZeroValue {
                field: "limits.max_nodes_per_input",
            });
        }
        if self.max_edges_per_input == 0 {
            return Err(ConfigError::ZeroValue {
                field: "limits.max_edges_per_input",
            });
        }
        if self.max_total_nodes == 0 {
            return Err(ConfigError::ZeroValue {
                field: "limits.max_total_nodes",
            });
        }
        if self.max_identifiers_per_node == 0 {
            return Err(ConfigError::ZeroValue {
                field: "limits.max_identifiers_per_node",
            });
        }
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroValue {
                field: "limits.max_depth",
            });
        }
        if self.max_depth > MAX_DEPTH_CEILING {
            return Err(ConfigError::DepthAboveCeiling {
                max_depth: self.max_depth,
                ceiling: MAX_DEPTH_CEILING,
            });
        }
        Ok(())
    }
}

/// Nesting depth of a JSON document. Scalars have depth 0.
///
/// Walks with an explicit stack, so hostile documents cannot exhaust the
/// call stack here.
#[must_use]
pub fn json_depth(value: &Json) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(value, 0usize)];
    while let Some((current, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        match current {
            Json::Array(items) => stack.extend(items.iter().map(|v| (v, depth + 1))),
            Json::Object(map) => stack.extend(map.values().map(|v| (v, depth + 1))),
            _ => {}
        }
    }
    deepest
}

/// Checks one input against `limits`.
///
/// # Errors
///
/// Returns the first `LimitError` found.
pub fn check_limits(graph: &Graph, limits: &InputLimits) -> Result<(), LimitError> {
    let source_label = || graph.meta.source_label();

    if graph.nodes.len() > limits.max_nodes_per_input {
        return Err(LimitError::TooManyNodes {
            source_label: source_label(),
            max: limits.max_nodes_per_input,
            actual: graph.nodes.len(),
        });
    }
    if graph.edges.len() > limits.max_edges_per_input {
        return Err(LimitError::TooManyEdges {
            source_label: source_label(),
            max: limits.max_edges_per_input,
            actual: graph.edges.len(),
        });
    }

    for node in &graph.nodes {
        if node.identifiers.len() > limits.max_identifiers_per_node {
            return Err(LimitError::TooManyIdentifiers {
                source_label: source_label(),
                node: node.id.clone(),
                max: limits.max_identifiers_per_node,
                actual: node.identifiers.len(),
            });
        }
        let values = structured_values(&node.properties, &node.extensions).chain(carried_values(&node.conflicts));
        check_depth(node.id.as_str(), values, limits, source_label)?;
    }
    for edge in &graph.edges {
        let perspectives = edge
            .perspectives
            .iter()
            .map(|p| (Cow::Borrowed(p.property.as_str()), &p.value));
        let values = structured_values(&edge.properties, &edge.extensions)
            .chain(carried_values(&edge.conflicts))
            .chain(perspectives);
        check_depth(edge.id.as_str(), values, limits, source_label)?;
    }
    Ok(())
}

/// Structured properties and extensions, by name.
fn structured_values<'a>(
    properties: &'a BTreeMap<String, Value>,
    extensions: &'a BTreeMap<String, Json>,
) -> impl Iterator<Item = (Cow<'a, str>, &'a Json)> {
    properties
        .iter()
        .filter_map(|(name, value)| value.as_structured().map(|json| (Cow::Borrowed(name.as_str()), json)))
        .chain(extensions.iter().map(|(name, json)| (Cow::Borrowed(name.as_str()), json)))
}

/// Competing values of conflicts carried in from an earlier merge, by path.
fn carried_values(conflicts: &[PropertyConflict]) -> impl Iterator<Item = (Cow<'_, str>, &Json)> {
    conflicts.iter().flat_map(|conflict| {
        conflict
            .values
            .iter()
            .map(move |v| (Cow::Owned(conflict.path.to_string()), &v.value))
    })
}

fn check_depth<'a>(
    element: &str,
    values: impl Iterator<Item = (Cow<'a, str>, &'a Json)>,
    limits: &InputLimits,
    source_label: impl Fn() -> String,
) -> Result<(), LimitError> {
    for (name, json) in values {
        if json_depth(json) > limits.max_depth {
            return Err(LimitError::NestingTooDeep {
                source_label: source_label(),
                element: element.to_string(),
                property: name.into_owned(),
                max: limits.max_depth,
            });
        }
    }
    Ok(())
}

/// Checks the aggregate node count across all inputs.
///
/// # Errors
///
/// Returns `LimitError::TooManyTotalNodes` when the sum exceeds the limit.
pub fn check_total(graphs: &[Graph], limits: &InputLimits) -> Result<(), LimitError> {
    let total: usize = graphs.iter().map(|g| g.nodes.len()).sum();
    if total > limits.max_total_nodes {
        return Err(LimitError::TooManyTotalNodes {
            max: limits.max_total_nodes,
            actual: total,
        });
    }
    Ok(())
}

/// Every structural defect of `graph`, in discovery order.
#[must_use]
pub fn check_structure(graph: &Graph) -> Vec<StructuralError> {
    let mut errors = Vec::new();

    if graph.meta.sources.is_empty() {
        if !graph.is_empty() {
            errors.push(StructuralError::MissingSourceLabel {
                nodes: graph.nodes.len(),
                edges: graph.edges.len(),
            });
        }
        return errors;
    }
    let source_label = graph.meta.source_label();

    let mut node_ids = BTreeSet::new();
    for node in &graph.nodes {
        if node.id.is_empty() {
            errors.push(StructuralError::EmptyNodeId {
                source_label: source_label.clone(),
            });
        } else if !node_ids.insert(&node.id) {
            errors.push(StructuralError::DuplicateNodeId {
                source_label: source_label.clone(),
                id: node.id.clone(),
            });
        }
        check_node(node, &source_label, &mut errors);
    }

    let mut edge_ids = BTreeSet::new();
    for edge in &graph.edges {
        if edge.id.is_empty() {
            errors.push(StructuralError::EmptyEdgeId {
                source_label: source_label.clone(),
            });
        } else if !edge_ids.insert(&edge.id) {
            errors.push(StructuralError::DuplicateEdgeId {
                source_label: source_label.clone(),
                id: edge.id.clone(),
            });
        }
        for endpoint in [&edge.source, &edge.target] {
            if !node_ids.contains(endpoint) {
                errors.push(StructuralError::DanglingEndpoint {
                    source_label: source_label.clone(),
                    edge: edge.id.clone(),
                    endpoint: endpoint.clone(),
                });
            }
        }
        if let Some((from, to)) = edge.validity.and_then(|w| w.inverted_bounds()) {
            errors.push(StructuralError::InvalidValidity {
                source_label: source_label.clone(),
                element: edge.id.to_string(),
                from,
                to,
            });
        }
    }

    errors
}

fn check_node(node: &Node, source_label: &str, errors: &mut Vec<StructuralError>) {
    for identifier in &node.identifiers {
        if identifier.scheme.trim().is_empty() || identifier.value.trim().is_empty() {
            errors.push(StructuralError::EmptyIdentifier {
                source_label: source_label.to_string(),
                node: node.id.clone(),
            });
        }
        if let Some((from, to)) = identifier.validity.and_then(|w| w.inverted_bounds()) {
            errors.push(StructuralError::InvalidValidity {
                source_label: source_label.to_string(),
                element: node.id.to_string(),
                from,
                to,
            });
        }
    }
}
