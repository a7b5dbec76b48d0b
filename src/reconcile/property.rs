//! Property reconciliation within one merge group.
//!
//! Every value is decomposed into leaf claims: non-empty objects are split
//! key by key, anything else (scalars, arrays, `{}`) is a leaf. Claims are
//! grouped per path by canonical JSON, with the union of their sources. A
//! path with one value class is agreed; more than one is a conflict and the
//! value is left unresolved. Conflicts carried by a member re-enter as
//! claims, so the result depends only on the union of the original claims
//! and re-merging in any order gives the same node.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value as Json};

use crate::canonical::canonical_id;
use crate::error::{MergeError, MergeResult};
use crate::model::{
    ConflictValue, Identifier, Label, Node, NodeType, PropertyConflict, PropertyPath, Provenance,
};
use crate::scheme::SchemeRegistry;
use crate::value::{canonical_json, json_key, Value};

const EMPTY_OBJECT_KEY: &str = "{}";

/// Claims gathered for one output element, grouped by path and value.
#[derive(Debug, Default)]
pub struct ClaimSet {
    paths: BTreeMap<PropertyPath, BTreeMap<String, ConflictValue>>,
}

impl ClaimSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one leaf claim. The value is canonicalized first.
    pub fn add(&mut self, path: PropertyPath, value: &Json, sources: &BTreeSet<String>) {
        let value = canonical_json(value);
        let class = self
            .paths
            .entry(path)
            .or_default()
            .entry(json_key(&value))
            .or_insert_with(|| ConflictValue {
                value,
                sources: BTreeSet::new(),
            });
        class.sources.extend(sources.iter().cloned());
    }

    /// Splits `value` into leaf claims below `root`. Each leaf takes its
    /// sources from `provenance`, falling back to `graph_sources`.
    ///
    /// Walks with an explicit stack; depth is bounded by input validation.
    pub fn add_document(
        &mut self,
        root: PropertyPath,
        value: &Json,
        provenance: &Provenance,
        graph_sources: &BTreeSet<String>,
    ) {
        let mut stack = vec![(root, value)];
        while let Some((path, value)) = stack.pop() {
            match value {
                Json::Object(map) if !map.is_empty() => {
                    for (key, child) in map {
                        stack.push((path.child(key), child));
                    }
                }
                leaf => {
                    let sources = provenance.sources_for(&path, graph_sources);
                    self.add(path, leaf, sources);
                }
            }
        }
    }

    /// Re-enters the values of a carried conflict as claims.
    pub fn add_conflict(&mut self, conflict: &PropertyConflict) {
        for value in &conflict.values {
            self.add(conflict.path.clone(), &value.value, &value.sources);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Splits claims into agreed values and conflicts.
    ///
    /// A path that has claims below it as well is a shape clash: an empty
    /// object there is subsumed by the children, any other value is recorded
    /// as a conflict on that path while the children reconcile on their own.
    #[must_use]
    pub fn resolve(self) -> Resolution {
        let entries: Vec<_> = self.paths.into_iter().collect();
        let mut resolution = Resolution::default();

        for (i, (path, classes)) in entries.iter().enumerate() {
            // Descendants sort immediately after their ancestor.
            let has_children = entries
                .get(i + 1)
                .is_some_and(|(next, _)| path.is_ancestor_of(next));

            let mut classes = classes.clone();
            if has_children {
                classes.remove(EMPTY_OBJECT_KEY);
                if !classes.is_empty() {
                    resolution.conflicts.push(PropertyConflict {
                        path: path.clone(),
                        values: classes.into_values().collect(),
                    });
                }
                continue;
            }

            if classes.len() == 1 {
                if let Some((_, agreed)) = classes.pop_first() {
                    resolution.agreed.insert(path.clone(), agreed);
                }
            } else {
                resolution.conflicts.push(PropertyConflict {
                    path: path.clone(),
                    values: classes.into_values().collect(),
                });
            }
        }

        resolution
    }
}

/// Outcome of [`ClaimSet::resolve`].
#[derive(Debug, Default)]
pub struct Resolution {
    pub agreed: BTreeMap<PropertyPath, ConflictValue>,
    pub conflicts: Vec<PropertyConflict>,
}

impl Resolution {
    #[must_use]
    pub fn conflict(&self, path: &PropertyPath) -> Option<&PropertyConflict> {
        self.conflicts.iter().find(|c| &c.path == path)
    }

    /// Typed properties rebuilt from agreed `Property` leaves.
    #[must_use]
    pub fn properties(&self) -> BTreeMap<String, Value> {
        self.tree(|p| matches!(p, PropertyPath::Property(_)))
            .into_iter()
            .map(|(k, v)| (k, Value::from_json(&v)))
            .collect()
    }

    /// Extension values rebuilt from agreed `Extension` leaves.
    #[must_use]
    pub fn extensions(&self) -> BTreeMap<String, Json> {
        self.tree(|p| matches!(p, PropertyPath::Extension(_)))
    }

    /// Sources of every agreed path.
    #[must_use]
    pub fn provenance(&self) -> Provenance {
        let mut provenance = Provenance::new();
        for (path, agreed) in &self.agreed {
            provenance.insert(path.clone(), agreed.sources.clone());
        }
        provenance
    }

    fn tree(&self, select: impl Fn(&PropertyPath) -> bool) -> BTreeMap<String, Json> {
        let mut root: BTreeMap<String, Json> = BTreeMap::new();

        'leaves: for (path, agreed) in self.agreed.iter().filter(|(p, _)| select(p)) {
            let Some((first, rest)) = path.segments().split_first() else {
                continue;
            };
            let Some((last, middle)) = rest.split_last() else {
                root.insert(first.clone(), agreed.value.clone());
                continue;
            };

            let mut cursor = root
                .entry(first.clone())
                .or_insert_with(|| Json::Object(Map::new()));
            for segment in middle {
                let Json::Object(map) = cursor else {
                    continue 'leaves;
                };
                cursor = map
                    .entry(segment.clone())
                    .or_insert_with(|| Json::Object(Map::new()));
            }
            if let Json::Object(map) = cursor {
                map.insert(last.clone(), agreed.value.clone());
            }
        }

        root
    }
}

/// One node of a merge group with the sources of the graph it came from.
#[derive(Debug, Clone, Copy)]
pub struct Member<'a> {
    pub node: &'a Node,
    pub graph_sources: &'a BTreeSet<String>,
}

/// A group reconciled into one node. The id is assigned later, once every
/// group is reconciled and can be ordered.
#[derive(Debug, Clone)]
pub struct ReconciledNode {
    pub node: Node,
    /// Every type claimed by the group when it disagreed.
    pub type_mismatch: Option<Vec<NodeType>>,
}

/// Reconciles the members of one merge group into a single node.
///
/// # Errors
///
/// Returns `MergeError::Serialization` if a type tag cannot round-trip
/// through JSON.
pub fn reconcile_group(members: &[Member<'_>], registry: &SchemeRegistry) -> MergeResult<ReconciledNode> {
    let mut claims = ClaimSet::new();
    for member in members {
        add_node_claims(&mut claims, member)?;
    }
    let resolution = claims.resolve();

    let (node_type, type_mismatch) = match resolution.conflict(&PropertyPath::NodeType) {
        Some(conflict) => {
            let mut types = conflict
                .values
                .iter()
                .map(|v| serde_json::from_value::<NodeType>(v.value.clone()))
                .collect::<Result<Vec<_>, _>>()?;
            types.sort();
            types.dedup();
            let smallest = types
                .first()
                .cloned()
                .ok_or_else(|| MergeError::invariant("type conflict without values"))?;
            (smallest, Some(types))
        }
        None => match resolution.agreed.get(&PropertyPath::NodeType) {
            Some(agreed) => (serde_json::from_value::<NodeType>(agreed.value.clone())?, None),
            None => (
                members
                    .iter()
                    .map(|m| m.node.node_type.clone())
                    .min()
                    .unwrap_or(NodeType::Organization),
                None,
            ),
        },
    };

    let mut node = Node::new("", node_type);
    node.identifiers = union_identifiers(members.iter().map(|m| m.node), registry);
    node.labels = members
        .iter()
        .flat_map(|m| m.node.labels.iter().cloned())
        .collect::<BTreeSet<Label>>()
        .into_iter()
        .collect();
    node.sensitivity = members.iter().filter_map(|m| m.node.sensitivity).max();
    node.properties = resolution.properties();
    node.extensions = resolution.extensions();
    node.provenance = resolution.provenance();
    node.conflicts = resolution.conflicts;

    Ok(ReconciledNode { node, type_mismatch })
}

fn add_node_claims(claims: &mut ClaimSet, member: &Member<'_>) -> MergeResult<()> {
    let node = member.node;
    let type_conflicted = node.conflicts.iter().any(|c| c.path == PropertyPath::NodeType);
    if !type_conflicted {
        let sources = node.provenance.sources_for(&PropertyPath::NodeType, member.graph_sources);
        claims.add(PropertyPath::NodeType, &serde_json::to_value(&node.node_type)?, sources);
    }

    for (key, value) in &node.properties {
        claims.add_document(
            PropertyPath::property(key.clone()),
            &value.to_json(),
            &node.provenance,
            member.graph_sources,
        );
    }
    for (key, value) in &node.extensions {
        claims.add_document(
            PropertyPath::extension(key.clone()),
            value,
            &node.provenance,
            member.graph_sources,
        );
    }
    for conflict in &node.conflicts {
        claims.add_conflict(conflict);
    }
    Ok(())
}

/// Union of identifier records, exact duplicates dropped, sorted by
/// canonical identity string then by record.
pub fn union_identifiers<'a>(nodes: impl Iterator<Item = &'a Node>, registry: &SchemeRegistry) -> Vec<Identifier> {
    let unique: BTreeSet<&Identifier> = nodes.flat_map(|n| n.identifiers.iter()).collect();
    let mut keyed: Vec<(String, &Identifier)> = unique
        .into_iter()
        .map(|id| (canonical_id(id, registry), id))
        .collect();
    keyed.sort();
    keyed.into_iter().map(|(_, id)| id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sources(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_agreeing_numbers_merge() {
        let a = Node::new("a1", NodeType::Organization).with_property("revenue", 100);
        let b = Node::new("b1", NodeType::Organization).with_property("revenue", 100.0);
        let (sa, sb) = (sources(&["A"]), sources(&["B"]));
        let members = [
            Member { node: &a, graph_sources: &sa },
            Member { node: &b, graph_sources: &sb },
        ];
        let merged = reconcile_group(&members, &SchemeRegistry::standard()).unwrap().node;
        assert_eq!(merged.property("revenue"), Some(&Value::Int(100)));
        assert_eq!(
            merged.provenance.get(&PropertyPath::property("revenue")),
            Some(&sources(&["A", "B"]))
        );
        assert!(merged.conflicts.is_empty());
    }

    #[test]
    fn test_disagreeing_scalars_conflict() {
        let a = Node::new("a1", NodeType::Organization).with_property("revenue", 100);
        let b = Node::new("b1", NodeType::Organization).with_property("revenue", 200);
        let (sa, sb) = (sources(&["A"]), sources(&["B"]));
        let members = [
            Member { node: &a, graph_sources: &sa },
            Member { node: &b, graph_sources: &sb },
        ];
        let merged = reconcile_group(&members, &SchemeRegistry::standard()).unwrap().node;
        assert!(merged.property("revenue").is_none());
        let conflict = merged.conflict_for("revenue").unwrap();
        assert_eq!(conflict.values.len(), 2);
        assert_eq!(conflict.values[0].value, json!(100));
        assert_eq!(conflict.values[0].sources, sources(&["A"]));
        assert_eq!(conflict.values[1].sources, sources(&["B"]));
    }

    #[test]
    fn test_nested_objects_reconcile_per_key() {
        let mut claims = ClaimSet::new();
        let empty = Provenance::new();
        claims.add_document(
            PropertyPath::extension("meta"),
            &json!({"a": 1, "b": {"c": true}}),
            &empty,
            &sources(&["A"]),
        );
        claims.add_document(
            PropertyPath::extension("meta"),
            &json!({"a": 2, "b": {"c": true}}),
            &empty,
            &sources(&["B"]),
        );
        let resolution = claims.resolve();
        assert_eq!(resolution.extensions()["meta"], json!({"b": {"c": true}}));
        assert_eq!(resolution.conflicts.len(), 1);
        assert_eq!(resolution.conflicts[0].path, PropertyPath::extension("meta").child("a"));
    }

    #[test]
    fn test_shape_clash_keeps_children() {
        let mut claims = ClaimSet::new();
        let empty = Provenance::new();
        claims.add_document(PropertyPath::extension("meta"), &json!("opaque"), &empty, &sources(&["A"]));
        claims.add_document(PropertyPath::extension("meta"), &json!({"a": 1}), &empty, &sources(&["B"]));
        claims.add_document(PropertyPath::extension("meta"), &json!({}), &empty, &sources(&["C"]));
        let resolution = claims.resolve();
        assert_eq!(resolution.extensions()["meta"], json!({"a": 1}));
        let clash = resolution.conflict(&PropertyPath::extension("meta")).unwrap();
        assert_eq!(clash.values.len(), 1);
        assert_eq!(clash.values[0].value, json!("opaque"));
    }

    #[test]
    fn test_carried_conflict_reenters() {
        let mut carried = Node::new("m", NodeType::Organization);
        carried.conflicts.push(PropertyConflict {
            path: PropertyPath::property("revenue"),
            values: vec![
                ConflictValue { value: json!(100), sources: sources(&["A"]) },
                ConflictValue { value: json!(200), sources: sources(&["B"]) },
            ],
        });
        let c = Node::new("c1", NodeType::Organization).with_property("revenue", 100);
        let (s_ab, sc) = (sources(&["A", "B"]), sources(&["C"]));
        let members = [
            Member { node: &carried, graph_sources: &s_ab },
            Member { node: &c, graph_sources: &sc },
        ];
        let merged = reconcile_group(&members, &SchemeRegistry::standard()).unwrap().node;
        let conflict = merged.conflict_for("revenue").unwrap();
        assert_eq!(conflict.values[0].sources, sources(&["A", "C"]));
        assert_eq!(conflict.values[1].sources, sources(&["B"]));
    }

    #[test]
    fn test_type_mismatch_keeps_smallest_type() {
        let a = Node::new("a1", NodeType::Facility);
        let b = Node::new("b1", NodeType::Organization);
        let (sa, sb) = (sources(&["A"]), sources(&["B"]));
        let members = [
            Member { node: &a, graph_sources: &sa },
            Member { node: &b, graph_sources: &sb },
        ];
        let merged = reconcile_group(&members, &SchemeRegistry::standard()).unwrap();
        assert_eq!(merged.node.node_type, NodeType::Organization);
        assert_eq!(
            merged.type_mismatch,
            Some(vec![NodeType::Organization, NodeType::Facility])
        );
        assert!(merged.node.conflicts.iter().any(|c| c.path == PropertyPath::NodeType));
    }

    #[test]
    fn test_identifiers_and_labels_union_sorted() {
        let registry = SchemeRegistry::standard();
        let a = Node::new("a1", NodeType::Organization)
            .with_identifier(Identifier::new("lei", "5493001KJTIIGC8Y1R12"))
            .with_identifier(Identifier::new("duns", "123456789"))
            .with_label(Label::new("tier", Some("1")));
        let b = Node::new("b1", NodeType::Organization)
            .with_identifier(Identifier::new("duns", "123456789"))
            .with_label(Label::new("tier", Some("1")))
            .with_label(Label::new("audited", None));
        let (sa, sb) = (sources(&["A"]), sources(&["B"]));
        let members = [
            Member { node: &a, graph_sources: &sa },
            Member { node: &b, graph_sources: &sb },
        ];
        let merged = reconcile_group(&members, &registry).unwrap().node;
        let schemes: Vec<_> = merged.identifiers.iter().map(|i| i.scheme.as_str()).collect();
        assert_eq!(schemes, vec!["duns", "lei"]);
        assert_eq!(merged.labels.len(), 2);
        assert_eq!(merged.labels[0].key, "audited");
    }

    #[test]
    fn test_merged_node_is_a_fixpoint() {
        let registry = SchemeRegistry::standard();
        let a = Node::new("a1", NodeType::Organization)
            .with_property("name", "Acme")
            .with_extension("meta", json!({"x": 1}));
        let b = Node::new("b1", NodeType::Organization)
            .with_property("name", "ACME")
            .with_extension("meta", json!({"x": 1, "y": [1, 2]}));
        let (sa, sb) = (sources(&["A"]), sources(&["B"]));
        let members = [
            Member { node: &a, graph_sources: &sa },
            Member { node: &b, graph_sources: &sb },
        ];
        let once = reconcile_group(&members, &registry).unwrap().node;
        let all = sources(&["A", "B"]);
        let twice = reconcile_group(&[Member { node: &once, graph_sources: &all }], &registry)
            .unwrap()
            .node;
        assert_eq!(once, twice);
    }
}
