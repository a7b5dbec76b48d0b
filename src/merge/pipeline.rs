//! The merge orchestrator.
//!
//! Inputs are treated as a set: they are ordered by content fingerprint
//! before any work, and every later ordering derives from content, so the
//! result never depends on the order callers pass graphs in.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info, instrument};

use crate::canonical::{canonical_id, content_key, fingerprint};
use crate::error::{MergeError, MergeResult};
use crate::identity::{scan_bucket, BucketScan, EquivalenceConfidence, IdentifierIndex, IndexEntry, PairFinding};
use crate::model::{Arena, Edge, Graph, GraphMeta, Handle, Node, NodeId, Sensitivity};
use crate::reconcile::{
    assign_edge_ids, group_edges, reconcile_edge_group, reconcile_group, EdgeMember, Member, ReconciledNode,
};
use crate::scheme::{SchemeFinding, SchemeRegistry};
use crate::union_find::UnionFind;
use crate::validation::{check_limits, check_structure, check_total};

use super::config::MergeConfig;
use super::metadata::{Advisory, AppliedEquivalence, ConflictEntry, ElementRef, GroupSummary, MergeMetadata, MergeOutput, Origin};
use super::parallel::map_parallel;

/// A node in the working set, tagged with the input it came from.
#[derive(Debug, Clone, Copy)]
struct NodeSlot<'a> {
    input: usize,
    node: &'a Node,
}

#[derive(Debug, Clone, Copy)]
struct EdgeSlot<'a> {
    input: usize,
    edge: &'a Edge,
}

/// Input graphs after validation and de-duplication, in fingerprint order.
struct Inputs<'a> {
    graphs: Vec<&'a Graph>,
    labels: Vec<String>,
    deduplicated: usize,
}

impl<'a> Inputs<'a> {
    fn origin(&self, slot: NodeSlot<'_>) -> Origin {
        Origin::new(self.labels[slot.input].clone(), slot.node.id.as_str())
    }

    fn sources(&self, input: usize) -> &'a BTreeSet<String> {
        &self.graphs[input].meta.sources
    }
}

/// A reconciled group with its ordering key, before ids are assigned.
struct PlannedNode {
    key: (bool, Option<String>, String, Vec<Origin>),
    reconciled: ReconciledNode,
    members: Vec<Origin>,
    sources: BTreeSet<String>,
    handles: Vec<usize>,
}

/// Merges graphs under a fixed configuration and scheme registry.
///
/// # Examples
///
/// ```
/// use netmerge::{Graph, Identifier, Merger, Node, NodeType};
///
/// let a = Graph::new("buyer-a").with_node(
///     Node::new("acme", NodeType::Organization)
///         .with_identifier(Identifier::new("lei", "5493001KJTIIGC8Y1R12"))
///         .with_property("name", "Acme Corp"),
/// );
/// let b = Graph::new("buyer-b").with_node(
///     Node::new("supplier-7", NodeType::Organization)
///         .with_identifier(Identifier::new("lei", "5493001KJTIIGC8Y1R12"))
///         .with_property("country", "DE"),
/// );
///
/// let output = Merger::default().merge(&[a, b]).unwrap();
/// assert_eq!(output.graph.nodes.len(), 1);
/// let node = &output.graph.nodes[0];
/// assert_eq!(node.id.as_str(), "n-1");
/// assert!(node.property("name").is_some() && node.property("country").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Merger {
    config: MergeConfig,
    registry: SchemeRegistry,
}

impl Default for Merger {
    fn default() -> Self {
        Self::new(MergeConfig::default(), SchemeRegistry::standard())
    }
}

impl Merger {
    #[must_use]
    pub const fn new(config: MergeConfig, registry: SchemeRegistry) -> Self {
        Self { config, registry }
    }

    #[must_use]
    pub const fn config(&self) -> &MergeConfig {
        &self.config
    }

    #[must_use]
    pub const fn registry(&self) -> &SchemeRegistry {
        &self.registry
    }

    /// Merges `inputs` into one graph.
    ///
    /// # Errors
    ///
    /// - `MergeError::Config` for an invalid configuration
    /// - `MergeError::Limit` when an input exceeds the configured limits
    /// - `MergeError::InvalidInput` with every structural defect of the
    ///   first invalid input
    /// - internal errors if a post-merge invariant fails
    #[instrument(skip_all, fields(inputs = inputs.len()))]
    pub fn merge(&self, inputs: &[Graph]) -> MergeResult<MergeOutput> {
        self.config.validate()?;
        for graph in inputs {
            check_limits(graph, &self.config.limits)?;
        }
        check_total(inputs, &self.config.limits)?;
        for graph in inputs {
            let errors = check_structure(graph);
            if !errors.is_empty() {
                return Err(MergeError::InvalidInput {
                    source_label: graph.meta.source_label(),
                    errors,
                });
            }
        }

        if inputs.is_empty() {
            return Ok(MergeOutput {
                graph: Graph::empty(),
                metadata: MergeMetadata::empty(),
            });
        }

        let inputs = prepare(inputs)?;
        let mut advisories = Vec::new();

        // Working set.
        let mut nodes: Arena<NodeSlot<'_>> = Arena::with_capacity(inputs.graphs.iter().map(|g| g.nodes.len()).sum());
        let mut edges: Arena<EdgeSlot<'_>> = Arena::with_capacity(inputs.graphs.iter().map(|g| g.edges.len()).sum());
        let mut handles: Vec<HashMap<&NodeId, Handle>> = Vec::with_capacity(inputs.graphs.len());
        for (input, graph) in inputs.graphs.iter().enumerate() {
            let mut local = HashMap::with_capacity(graph.nodes.len());
            for node in &graph.nodes {
                local.insert(&node.id, nodes.insert(NodeSlot { input, node }));
            }
            for edge in &graph.edges {
                edges.insert(EdgeSlot { input, edge });
            }
            handles.push(local);
        }

        self.check_schemes(&inputs, &nodes, &mut advisories);

        // Identity links.
        let index = IdentifierIndex::build(nodes.iter().map(|(h, slot)| (h, slot.node)), &self.registry);
        let lookup = |entry: IndexEntry| {
            nodes
                .get(entry.handle)
                .and_then(|slot| slot.node.identifiers.get(entry.position))
        };
        let registry = &self.registry;
        let scans: Vec<(&str, BucketScan)> = map_parallel(
            index.candidate_buckets(),
            self.config.workers,
            self.config.queue_capacity,
            |(key, entries)| (key, scan_bucket(entries, lookup, registry)),
        )?;

        let mut uf = UnionFind::new(nodes.capacity_used());
        let mut link_count = 0usize;
        for (key, scan) in &scans {
            for (a, b) in &scan.links {
                if uf.union_handles(*a, *b) {
                    link_count += 1;
                }
            }
            for (finding, lo, hi) in &scan.findings {
                let members = [lo, hi]
                    .iter()
                    .filter_map(|e| nodes.get(e.handle).map(|slot| inputs.origin(*slot)))
                    .collect();
                let identifier = (*key).to_string();
                advisories.push(match finding {
                    PairFinding::UnboundedValidity => Advisory::UnboundedValidity { identifier, members },
                    PairFinding::TemporalMismatch => Advisory::TemporalMismatch { identifier, members },
                });
            }
        }
        debug!(buckets = scans.len(), links = link_count, "identity links resolved");

        // Equivalence assertions at or above the threshold become links and
        // leave the edge set. Metadata keeps a record of each.
        let mut consumed = Vec::new();
        for (handle, slot) in edges.iter() {
            let Some(confidence) = EquivalenceConfidence::of_edge(slot.edge) else {
                continue;
            };
            if confidence < self.config.equivalence_threshold {
                continue;
            }
            let local = &handles[slot.input];
            if let (Some(a), Some(b)) = (local.get(&slot.edge.source), local.get(&slot.edge.target)) {
                uf.union_handles(*a, *b);
                consumed.push((handle, *slot, *a, confidence));
            }
        }
        for (handle, ..) in &consumed {
            edges.tombstone(*handle);
        }
        debug!(equivalences = consumed.len(), "equivalence assertions applied");

        // Group reconciliation.
        let groups = uf.groups();
        debug!(groups = groups.len(), nodes = nodes.len(), "merge groups formed");
        let planned = self.plan_nodes(&inputs, &nodes, groups)?;

        let mut out_id: Vec<Option<NodeId>> = vec![None; nodes.capacity_used()];
        let mut output_nodes = Vec::with_capacity(planned.len());
        let mut summaries = Vec::with_capacity(planned.len());
        let mut conflicts = Vec::new();
        let mut oversized_group_count = 0;
        for (k, plan) in planned.into_iter().enumerate() {
            let id = NodeId::new(format!("n-{}", k + 1));
            for handle in &plan.handles {
                out_id[*handle] = Some(id.clone());
            }
            if plan.handles.len() >= self.config.oversized_group_threshold {
                oversized_group_count += 1;
                advisories.push(Advisory::OversizedGroup {
                    node: id.clone(),
                    size: plan.handles.len(),
                    threshold: self.config.oversized_group_threshold,
                    sources: plan.sources,
                });
            }
            if let Some(types) = plan.reconciled.type_mismatch {
                advisories.push(Advisory::TypeMismatch { node: id.clone(), types });
            }

            let mut node = plan.reconciled.node;
            node.id = id.clone();
            conflicts.extend(node.conflicts.iter().map(|c| ConflictEntry::new(ElementRef::Node(id.clone()), c)));
            summaries.push(GroupSummary {
                node: id,
                size: plan.handles.len(),
                members: plan.members,
            });
            output_nodes.push(node);
        }

        let mut equivalences = consumed
            .into_iter()
            .map(|(_, slot, endpoint, confidence)| {
                let label = &inputs.labels[slot.input];
                let node = out_id[endpoint.index()]
                    .clone()
                    .ok_or_else(|| MergeError::invariant(format!("equivalence '{}' has no output node", slot.edge.id)))?;
                Ok(AppliedEquivalence {
                    edge: Origin::new(label.clone(), slot.edge.id.as_str()),
                    source: Origin::new(label.clone(), slot.edge.source.as_str()),
                    target: Origin::new(label.clone(), slot.edge.target.as_str()),
                    confidence,
                    node,
                })
            })
            .collect::<MergeResult<Vec<_>>>()?;
        equivalences.sort();

        // Edge remap and reconciliation.
        let mut members = Vec::with_capacity(edges.len());
        for (_, slot) in edges.iter() {
            let local = &handles[slot.input];
            let resolve = |id: &NodeId| {
                local
                    .get(id)
                    .and_then(|h| out_id[h.index()].clone())
                    .ok_or_else(|| MergeError::invariant(format!("edge endpoint '{id}' has no output node")))
            };
            let graph = inputs.graphs[slot.input];
            members.push(EdgeMember {
                edge: slot.edge,
                graph_sources: &graph.meta.sources,
                reporting_entity: graph.meta.reporting_entity(),
                source: resolve(&slot.edge.source)?,
                target: resolve(&slot.edge.target)?,
            });
        }
        let edge_groups = group_edges(members);
        let reconciled_edges = map_parallel(
            edge_groups,
            self.config.workers,
            self.config.queue_capacity,
            |(key, group)| reconcile_edge_group(&key, &group),
        )?
        .into_iter()
        .collect::<MergeResult<Vec<_>>>()?;
        let output_edges = assign_edge_ids(reconciled_edges)?;
        for edge in &output_edges {
            conflicts.extend(
                edge.conflicts
                    .iter()
                    .map(|c| ConflictEntry::new(ElementRef::Edge(edge.id.clone()), c)),
            );
        }
        debug!(edges = output_edges.len(), "edges reconciled");

        let graph = Graph {
            meta: merged_meta(&inputs.graphs),
            nodes: output_nodes,
            edges: output_edges,
        };
        check_invariants(&graph)?;

        advisories.sort();
        advisories.dedup();
        for advisory in &advisories {
            advisory.log();
        }

        let metadata = MergeMetadata {
            sources: graph.meta.sources.clone(),
            reporting_entities: graph.meta.reporting_entities.clone(),
            reporting_entity: graph.meta.reporting_entity().map(str::to_string),
            groups: summaries,
            conflicts,
            oversized_group_count,
            equivalences,
            input_count: inputs.graphs.len() + inputs.deduplicated,
            deduplicated_inputs: inputs.deduplicated,
            node_count: graph.nodes.len(),
            edge_count: graph.edges.len(),
            advisories,
            merged_at: chrono::Utc::now(),
        };
        info!(
            nodes = metadata.node_count,
            edges = metadata.edge_count,
            conflicts = metadata.conflicts.len(),
            advisories = metadata.advisories.len(),
            "merge complete"
        );

        Ok(MergeOutput { graph, metadata })
    }

    /// Raises scheme advisories: unknown schemes once each, malformed
    /// values per record.
    fn check_schemes(&self, inputs: &Inputs<'_>, nodes: &Arena<NodeSlot<'_>>, advisories: &mut Vec<Advisory>) {
        let mut unrecognized: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (_, slot) in nodes.iter() {
            for identifier in &slot.node.identifiers {
                match self.registry.check(identifier) {
                    Some(SchemeFinding::Unrecognized) => {
                        unrecognized
                            .entry(identifier.scheme_key())
                            .or_default()
                            .extend(inputs.sources(slot.input).iter().cloned());
                    }
                    Some(SchemeFinding::Malformed) => advisories.push(Advisory::MalformedIdentifier {
                        scheme: identifier.scheme_key(),
                        value: identifier.value.clone(),
                        origin: inputs.origin(*slot),
                    }),
                    None => {}
                }
            }
        }
        advisories.extend(
            unrecognized
                .into_iter()
                .map(|(scheme, sources)| Advisory::UnrecognizedScheme { scheme, sources }),
        );
    }

    /// Reconciles every group and sorts the results into output order.
    fn plan_nodes(
        &self,
        inputs: &Inputs<'_>,
        nodes: &Arena<NodeSlot<'_>>,
        groups: Vec<Vec<usize>>,
    ) -> MergeResult<Vec<PlannedNode>> {
        let registry = &self.registry;
        let plan_group = |handles: Vec<usize>| -> MergeResult<PlannedNode> {
            let slots: Vec<NodeSlot<'_>> = handles
                .iter()
                .filter_map(|h| nodes.get(Handle::from_index(*h)).copied())
                .collect();
            let group: Vec<Member<'_>> = slots
                .iter()
                .map(|slot| Member {
                    node: slot.node,
                    graph_sources: inputs.sources(slot.input),
                })
                .collect();
            let reconciled = reconcile_group(&group, registry)?;

            let representative = reconciled
                .node
                .identifiers
                .iter()
                .filter(|id| !registry.is_private(&id.scheme))
                .filter(|id| registry.effective_sensitivity(id, &reconciled.node.node_type) == Sensitivity::Public)
                .map(|id| canonical_id(id, registry))
                .min();
            let content = content_key(&reconciled.node)?;
            let mut members: Vec<Origin> = slots.iter().map(|slot| inputs.origin(*slot)).collect();
            members.sort();
            let sources = slots
                .iter()
                .flat_map(|slot| inputs.sources(slot.input).iter().cloned())
                .collect();

            Ok(PlannedNode {
                key: (representative.is_none(), representative, content, members.clone()),
                reconciled,
                members,
                sources,
                handles,
            })
        };

        let mut planned = map_parallel(groups, self.config.workers, self.config.queue_capacity, plan_group)?
            .into_iter()
            .collect::<MergeResult<Vec<_>>>()?;
        planned.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(planned)
    }
}

/// Merges `inputs` with the default configuration and standard registry.
///
/// # Errors
///
/// See [`Merger::merge`].
pub fn merge(inputs: &[Graph]) -> MergeResult<MergeOutput> {
    Merger::default().merge(inputs)
}

/// Orders inputs by content fingerprint and drops repeats.
///
/// Inputs form a set: a graph passed twice is one input. Without this,
/// nodes that carry no identifier would be duplicated by `merge(A, A)`.
fn prepare(inputs: &[Graph]) -> MergeResult<Inputs<'_>> {
    let mut keyed = inputs
        .iter()
        .map(|graph| Ok((fingerprint(graph)?, graph)))
        .collect::<MergeResult<Vec<_>>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let before = keyed.len();
    keyed.dedup_by(|a, b| a.0 == b.0);
    let graphs: Vec<&Graph> = keyed.into_iter().map(|(_, g)| g).collect();
    let deduplicated = before - graphs.len();
    if deduplicated > 0 {
        debug!(deduplicated, "identical inputs dropped");
    }
    Ok(Inputs {
        labels: graphs.iter().map(|g| g.meta.source_label()).collect(),
        graphs,
        deduplicated,
    })
}

/// File metadata of the merged graph.
///
/// Sources and reporting entities are unions. The disclosure scope is the
/// most restrictive declared by any input. A salt survives only when every
/// input that carries content shares it.
fn merged_meta(graphs: &[&Graph]) -> GraphMeta {
    let sources = graphs.iter().flat_map(|g| g.meta.sources.iter().cloned()).collect();
    let reporting_entities = graphs
        .iter()
        .flat_map(|g| g.meta.reporting_entities.iter().cloned())
        .collect();
    let disclosure_scope = graphs.iter().filter_map(|g| g.meta.disclosure_scope).max();

    let with_content: Vec<&Graph> = graphs.iter().copied().filter(|g| !g.is_empty()).collect();
    let candidates = if with_content.is_empty() { graphs } else { &with_content[..] };
    let salt = match candidates.split_first() {
        Some((first, rest)) if rest.iter().all(|g| g.meta.salt == first.meta.salt) => first.meta.salt.clone(),
        _ => None,
    };

    GraphMeta {
        sources,
        reporting_entities,
        disclosure_scope,
        salt,
    }
}

/// Post-merge checks. A failure here is a bug, never bad input.
fn check_invariants(graph: &Graph) -> MergeResult<()> {
    let mut node_ids = BTreeSet::new();
    for node in &graph.nodes {
        if !node_ids.insert(&node.id) {
            return Err(MergeError::invariant(format!("duplicate output node id '{}'", node.id)));
        }
        for conflict in &node.conflicts {
            if node.provenance.get(&conflict.path).is_some() {
                return Err(MergeError::invariant(format!(
                    "node '{}' both resolves and conflicts on '{}'",
                    node.id, conflict.path
                )));
            }
        }
    }

    let mut edge_ids = BTreeSet::new();
    for edge in &graph.edges {
        if !edge_ids.insert(&edge.id) {
            return Err(MergeError::invariant(format!("duplicate output edge id '{}'", edge.id)));
        }
        for endpoint in [&edge.source, &edge.target] {
            if !node_ids.contains(endpoint) {
                return Err(MergeError::invariant(format!(
                    "edge '{}' references missing node '{endpoint}'",
                    edge.id
                )));
            }
        }
    }
    Ok(())
}
