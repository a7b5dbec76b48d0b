//! Edge remapping and parallel-edge reconciliation.
//!
//! Edges are bucketed by (resolved source, resolved target, type). Inside a
//! bucket, edges collapse only when the per-type identity properties agree;
//! otherwise they stay as parallel edges. Equivalence assertions never
//! collapse: each one is a separate claim. Collapsed edges go through the same
//! claim reconciliation as node properties. Perspective properties are never
//! reconciled: every distinct value is kept with its reporting entity.

use std::collections::{BTreeMap, BTreeSet};

use crate::canonical::content_key;
use crate::error::{MergeError, MergeResult};
use crate::model::{Edge, EdgeId, EdgeType, NodeId, PerspectiveValue, PropertyPath};
use crate::value::json_key;

use super::property::ClaimSet;

/// Properties that distinguish two edges of the same type between the same
/// endpoints.
#[must_use]
pub const fn identity_properties(edge_type: &EdgeType) -> &'static [&'static str] {
    match edge_type {
        EdgeType::Ownership => &["percentage", "direct"],
        EdgeType::OperationalControl => &["control_type"],
        EdgeType::LegalParentage => &["consolidation_basis"],
        EdgeType::FormerIdentity => &["event_type", "effective_date"],
        EdgeType::BeneficialOwnership => &["control_type", "percentage"],
        EdgeType::Supplies | EdgeType::Subcontracts | EdgeType::SellsTo => &["commodity", "contract_ref"],
        EdgeType::Tolls | EdgeType::Brokers => &["commodity"],
        EdgeType::Distributes => &["service_type"],
        EdgeType::AttestedBy => &["scope"],
        EdgeType::Operates
        | EdgeType::Produces
        | EdgeType::ComposedOf
        | EdgeType::SameAs
        | EdgeType::Extension(_) => &[],
    }
}

/// Whether two edges of this type may ever become one.
#[must_use]
pub const fn collapses(edge_type: &EdgeType) -> bool {
    !matches!(edge_type, EdgeType::SameAs)
}

/// Properties whose value depends on the reporting entity's viewpoint.
#[must_use]
pub const fn perspective_properties(edge_type: &EdgeType) -> &'static [&'static str] {
    match edge_type {
        EdgeType::Supplies
        | EdgeType::Subcontracts
        | EdgeType::Tolls
        | EdgeType::Distributes
        | EdgeType::Brokers
        | EdgeType::SellsTo => &["tier", "share_of_buyer_demand"],
        EdgeType::Ownership
        | EdgeType::OperationalControl
        | EdgeType::LegalParentage
        | EdgeType::FormerIdentity
        | EdgeType::BeneficialOwnership
        | EdgeType::Operates
        | EdgeType::Produces
        | EdgeType::ComposedOf
        | EdgeType::AttestedBy
        | EdgeType::SameAs
        | EdgeType::Extension(_) => &[],
    }
}

/// An input edge with endpoints already remapped to output node ids.
#[derive(Debug, Clone)]
pub struct EdgeMember<'a> {
    pub edge: &'a Edge,
    pub graph_sources: &'a BTreeSet<String>,
    /// Reporting entity of the graph, when it has exactly one.
    pub reporting_entity: Option<&'a str>,
    pub source: NodeId,
    pub target: NodeId,
}

/// Composite key deciding which edges collapse into one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    pub source: NodeId,
    pub target: NodeId,
    pub edge_type: EdgeType,
    /// Canonical JSON of each identity property, `null` when absent.
    pub identity: Vec<String>,
    /// Position of the edge among all members, for types that never
    /// collapse.
    pub instance: Option<usize>,
}

impl EdgeKey {
    /// Key of the member at `position`.
    #[must_use]
    pub fn of(member: &EdgeMember<'_>, position: usize) -> Self {
        let edge_type = member.edge.edge_type.clone();
        let identity = identity_properties(&edge_type)
            .iter()
            .map(|name| {
                member
                    .edge
                    .property(name)
                    .map_or_else(|| "null".to_string(), |v| json_key(&v.to_json()))
            })
            .collect();
        Self {
            source: member.source.clone(),
            target: member.target.clone(),
            instance: (!collapses(&edge_type)).then_some(position),
            edge_type,
            identity,
        }
    }
}

/// Buckets edges by composite key, in key order.
#[must_use]
pub fn group_edges(members: Vec<EdgeMember<'_>>) -> Vec<(EdgeKey, Vec<EdgeMember<'_>>)> {
    let mut buckets: BTreeMap<EdgeKey, Vec<EdgeMember<'_>>> = BTreeMap::new();
    for (position, member) in members.into_iter().enumerate() {
        buckets.entry(EdgeKey::of(&member, position)).or_default().push(member);
    }
    buckets.into_iter().collect()
}

/// Reconciles one bucket into a single edge with an empty id.
///
/// # Errors
///
/// Returns `MergeError::Serialization` if a validity window cannot
/// round-trip through JSON.
pub fn reconcile_edge_group(key: &EdgeKey, members: &[EdgeMember<'_>]) -> MergeResult<Edge> {
    let perspective_keys = perspective_properties(&key.edge_type);
    let mut claims = ClaimSet::new();
    let mut perspectives: BTreeMap<(String, Option<String>, String), PerspectiveValue> = BTreeMap::new();

    for member in members {
        let edge = member.edge;
        for (name, value) in &edge.properties {
            let path = PropertyPath::property(name.clone());
            if perspective_keys.contains(&name.as_str()) {
                let sources = edge.provenance.sources_for(&path, member.graph_sources);
                add_perspective(
                    &mut perspectives,
                    PerspectiveValue {
                        property: name.clone(),
                        value: value.to_json(),
                        reporting_entity: member.reporting_entity.map(str::to_string),
                        sources: sources.clone(),
                    },
                );
            } else {
                claims.add_document(path, &value.to_json(), &edge.provenance, member.graph_sources);
            }
        }
        for (name, value) in &edge.extensions {
            claims.add_document(
                PropertyPath::extension(name.clone()),
                value,
                &edge.provenance,
                member.graph_sources,
            );
        }
        if let Some(validity) = &edge.validity {
            let sources = edge.provenance.sources_for(&PropertyPath::Validity, member.graph_sources);
            claims.add(PropertyPath::Validity, &serde_json::to_value(validity)?, sources);
        }
        for perspective in &edge.perspectives {
            add_perspective(&mut perspectives, perspective.clone());
        }
        for conflict in &edge.conflicts {
            claims.add_conflict(conflict);
        }
    }

    let resolution = claims.resolve();
    let mut edge = Edge::new("", key.edge_type.clone(), key.source.clone(), key.target.clone());
    edge.properties = resolution.properties();
    edge.extensions = resolution.extensions();
    edge.validity = match resolution.agreed.get(&PropertyPath::Validity) {
        Some(agreed) => Some(serde_json::from_value(agreed.value.clone())?),
        None => None,
    };
    edge.perspectives = perspectives.into_values().collect();
    edge.provenance = resolution.provenance();
    edge.conflicts = resolution.conflicts;
    Ok(edge)
}

fn add_perspective(
    perspectives: &mut BTreeMap<(String, Option<String>, String), PerspectiveValue>,
    value: PerspectiveValue,
) {
    let canonical = crate::value::canonical_json(&value.value);
    let key = (value.property.clone(), value.reporting_entity.clone(), json_key(&canonical));
    let entry = perspectives.entry(key).or_insert_with(|| PerspectiveValue {
        sources: BTreeSet::new(),
        value: canonical,
        ..value.clone()
    });
    entry.sources.extend(value.sources);
}

/// Orders reconciled edges by (source, target, type, content) and assigns
/// `e-<k>` ids.
///
/// # Errors
///
/// Returns `MergeError::Serialization` if an edge cannot be serialized.
pub fn assign_edge_ids(edges: Vec<Edge>) -> MergeResult<Vec<Edge>> {
    let mut keyed = edges
        .into_iter()
        .map(|edge| {
            let content = content_key(&edge)?;
            Ok(((edge.source.clone(), edge.target.clone(), edge.edge_type.clone(), content), edge))
        })
        .collect::<Result<Vec<_>, MergeError>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(keyed
        .into_iter()
        .enumerate()
        .map(|(k, (_, mut edge))| {
            edge.id = EdgeId::new(format!("e-{}", k + 1));
            edge
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member<'a>(edge: &'a Edge, sources: &'a BTreeSet<String>, entity: Option<&'a str>) -> EdgeMember<'a> {
        EdgeMember {
            edge,
            graph_sources: sources,
            reporting_entity: entity,
            source: NodeId::new("n-1"),
            target: NodeId::new("n-2"),
        }
    }

    fn sources(label: &str) -> BTreeSet<String> {
        BTreeSet::from([label.to_string()])
    }

    #[test]
    fn test_distinct_contracts_stay_parallel() {
        let a = Edge::new("e1", EdgeType::Supplies, "x", "y")
            .with_property("commodity", "7208")
            .with_property("contract_ref", "C-1");
        let b = Edge::new("e2", EdgeType::Supplies, "x", "y")
            .with_property("commodity", "7208")
            .with_property("contract_ref", "C-2");
        let (sa, sb) = (sources("A"), sources("B"));
        let groups = group_edges(vec![member(&a, &sa, None), member(&b, &sb, None)]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_same_identity_collapses_with_conflicts() {
        let a = Edge::new("e1", EdgeType::Supplies, "x", "y")
            .with_property("commodity", "7208")
            .with_property("volume", 10);
        let b = Edge::new("e2", EdgeType::Supplies, "x", "y")
            .with_property("commodity", "7208")
            .with_property("volume", 12);
        let (sa, sb) = (sources("A"), sources("B"));
        let groups = group_edges(vec![member(&a, &sa, None), member(&b, &sb, None)]);
        assert_eq!(groups.len(), 1);
        let (key, members) = &groups[0];
        let merged = reconcile_edge_group(key, members).unwrap();
        assert_eq!(merged.property("commodity").and_then(|v| v.as_string()), Some("7208"));
        assert!(merged.property("volume").is_none());
        assert_eq!(merged.conflicts.len(), 1);
    }

    #[test]
    fn test_operates_has_no_identity_properties() {
        let a = Edge::new("e1", EdgeType::Operates, "x", "y").with_property("since", 2001);
        let b = Edge::new("e2", EdgeType::Operates, "x", "y");
        let (sa, sb) = (sources("A"), sources("B"));
        let groups = group_edges(vec![member(&a, &sa, None), member(&b, &sb, None)]);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_same_as_never_collapses() {
        let a = Edge::new("e1", EdgeType::SameAs, "x", "y").with_property("confidence", "possible");
        let b = Edge::new("e2", EdgeType::SameAs, "x", "y").with_property("confidence", "possible");
        let (sa, sb) = (sources("A"), sources("B"));
        let groups = group_edges(vec![member(&a, &sa, None), member(&b, &sb, None)]);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|(key, members)| key.instance.is_some() && members.len() == 1));
        assert!(collapses(&EdgeType::Supplies));
    }

    #[test]
    fn test_perspectives_are_not_conflicts() {
        let a = Edge::new("e1", EdgeType::Supplies, "x", "y").with_property("tier", 1);
        let b = Edge::new("e2", EdgeType::Supplies, "x", "y").with_property("tier", 2);
        let (sa, sb) = (sources("A"), sources("B"));
        let groups = group_edges(vec![
            member(&a, &sa, Some("buyer-a")),
            member(&b, &sb, Some("buyer-b")),
        ]);
        let (key, members) = &groups[0];
        let merged = reconcile_edge_group(key, members).unwrap();
        assert!(merged.conflicts.is_empty());
        assert!(merged.property("tier").is_none());
        let tiers: Vec<_> = merged.perspectives_for("tier").collect();
        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[0].value, json!(1));
        assert_eq!(tiers[0].reporting_entity.as_deref(), Some("buyer-a"));
        assert_eq!(tiers[1].sources, sources("B"));
    }

    #[test]
    fn test_assign_edge_ids_is_ordered() {
        let later = Edge::new("", EdgeType::Operates, "n-2", "n-1");
        let earlier = Edge::new("", EdgeType::Supplies, "n-1", "n-2");
        let edges = assign_edge_ids(vec![later, earlier]).unwrap();
        assert_eq!(edges[0].id.as_str(), "e-1");
        assert_eq!(edges[0].source.as_str(), "n-1");
        assert_eq!(edges[1].id.as_str(), "e-2");
    }
}
