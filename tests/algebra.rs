//! Algebraic laws of the merge over generated graphs.

use std::collections::BTreeSet;

use netmerge::{
    merge, Edge, EdgeType, Graph, Identifier, MergeConfig, MergeOutput, Merger, Node, NodeType, SchemeRegistry,
    Value,
};
use proptest::prelude::*;

const LEIS: [&str; 3] = ["5493001KJTIIGC8Y1R12", "529900T8BM49AURSDO55", "213800D1EI4B9WTWWD28"];
const DUNS: [&str; 3] = ["100000001", "100000002", "100000003"];
const NAMES: [&str; 3] = ["Acme", "Borealis", "Cobalt"];

#[derive(Debug, Clone)]
struct NodeSpec {
    facility: bool,
    leis: BTreeSet<usize>,
    duns: Option<usize>,
    name: Option<usize>,
    size: Option<(i64, bool)>,
}

#[derive(Debug, Clone)]
struct EdgeSpec {
    source: usize,
    target: usize,
    ownership: bool,
    key: Option<u8>,
    tier: Option<i64>,
    volume: Option<i64>,
}

fn arb_node() -> impl Strategy<Value = NodeSpec> {
    (
        prop::bool::weighted(0.2),
        prop::collection::btree_set(0..LEIS.len(), 0..=2),
        prop::option::weighted(0.3, 0..DUNS.len()),
        prop::option::of(0..NAMES.len()),
        prop::option::of((0i64..3, any::<bool>())),
    )
        .prop_map(|(facility, leis, duns, name, size)| NodeSpec {
            facility,
            leis,
            duns,
            name,
            size,
        })
}

fn arb_edge() -> impl Strategy<Value = EdgeSpec> {
    (
        any::<usize>(),
        any::<usize>(),
        any::<bool>(),
        prop::option::of(0u8..2),
        prop::option::of(1i64..3),
        prop::option::of(0i64..3),
    )
        .prop_map(|(source, target, ownership, key, tier, volume)| EdgeSpec {
            source,
            target,
            ownership,
            key,
            tier,
            volume,
        })
}

fn build_graph(label: &str, nodes: &[NodeSpec], edges: &[EdgeSpec]) -> Graph {
    let mut graph = Graph::new(label).with_reporting_entity(label);
    for (i, spec) in nodes.iter().enumerate() {
        let node_type = if spec.facility { NodeType::Facility } else { NodeType::Organization };
        let mut node = Node::new(format!("{label}{i}"), node_type);
        for k in &spec.leis {
            node = node.with_identifier(Identifier::new("lei", LEIS[*k]));
        }
        if let Some(k) = spec.duns {
            node = node.with_identifier(Identifier::new("duns", DUNS[k]));
        }
        // Unidentified nodes with the same name (or none) are
        // indistinguishable by content; only their ids order them.
        if let Some(n) = spec.name {
            node = node.with_property("name", NAMES[n]);
        }
        if let Some((size, as_float)) = spec.size {
            node = if as_float {
                node.with_property("size", size as f64)
            } else {
                node.with_property("size", size)
            };
        }
        graph = graph.with_node(node);
    }

    if nodes.is_empty() {
        return graph;
    }
    for (j, spec) in edges.iter().enumerate() {
        let source = format!("{label}{}", spec.source % nodes.len());
        let target = format!("{label}{}", spec.target % nodes.len());
        let mut edge = if spec.ownership {
            let edge = Edge::new(format!("{label}-e{j}"), EdgeType::Ownership, source, target);
            match spec.key {
                Some(k) => edge.with_property("percentage", i64::from(k) * 50),
                None => edge,
            }
        } else {
            let edge = Edge::new(format!("{label}-e{j}"), EdgeType::Supplies, source, target);
            let edge = match spec.key {
                Some(k) => edge.with_property("commodity", format!("720{k}")),
                None => edge,
            };
            match spec.tier {
                Some(tier) => edge.with_property("tier", tier),
                None => edge,
            }
        };
        if let Some(volume) = spec.volume {
            edge = edge.with_property("volume", volume);
        }
        graph = graph.with_edge(edge);
    }
    graph
}

fn arb_graph(label: &'static str) -> impl Strategy<Value = Graph> {
    (
        prop::collection::vec(arb_node(), 0..13),
        prop::collection::vec(arb_edge(), 0..13),
    )
        .prop_map(move |(nodes, edges)| build_graph(label, &nodes, &edges))
}

fn merged(inputs: &[Graph]) -> MergeOutput {
    merge(inputs).unwrap()
}

fn canonical(inputs: &[Graph]) -> String {
    merged(inputs).graph.canonical_json().unwrap()
}

/// `identified` DUNS organizations plus two empty ones that differ only by
/// id, each supplying a different identified organization. The empty ones
/// sort last, so their generated ids straddle `n-9` and `n-10` when
/// `identified` is 7 or 8.
fn twin_suppliers(identified: usize) -> Graph {
    let mut graph = Graph::new("A");
    for i in 0..identified {
        graph = graph.with_node(
            Node::new(format!("d{i}"), NodeType::Organization)
                .with_identifier(Identifier::new("duns", format!("{:09}", 200 + i))),
        );
    }
    graph
        .with_node(Node::new("u0", NodeType::Organization))
        .with_node(Node::new("u1", NodeType::Organization))
        .with_edge(Edge::new("s0", EdgeType::Supplies, "u0", "d0"))
        .with_edge(Edge::new("s1", EdgeType::Supplies, "u1", "d1"))
}

fn single_org(label: &str, duns: &str) -> Graph {
    Graph::new(label).with_node(
        Node::new("x", NodeType::Organization).with_identifier(Identifier::new("duns", duns)),
    )
}

/// The identified organization each empty supplier points at, by DUNS.
fn supplied_duns(graph: &Graph) -> Vec<String> {
    let mut targets: Vec<String> = graph
        .edges
        .iter()
        .filter_map(|e| graph.node(e.target.as_str()))
        .flat_map(|n| n.identifiers.iter().map(|id| id.value.clone()))
        .collect();
    targets.sort();
    targets
}

#[test]
fn twin_nodes_keep_their_edges_across_groupings() {
    let a = twin_suppliers(7);
    let b = single_org("B", "300000001");
    let c = single_org("C", "300000002");

    let left = merged(&[merged(&[a.clone(), b.clone()]).graph, c.clone()]).graph;
    let right = merged(&[a.clone(), merged(&[b.clone(), c.clone()]).graph]).graph;
    assert_eq!(left.nodes.len(), 11);
    assert_eq!(left, right);
    assert_eq!(left, merged(&[a, b, c]).graph);
}

#[test]
fn twin_nodes_survive_remerge() {
    let once = merged(&[twin_suppliers(8)]).graph;
    let twice = merged(std::slice::from_ref(&once)).graph;
    assert_eq!(twice, once);
    assert_eq!(supplied_duns(&once), vec!["000000200", "000000201"]);

    let u0_edge = once
        .edges
        .iter()
        .find(|e| once.node(e.target.as_str()).is_some_and(|n| n.identifiers[0].value == "000000200"))
        .unwrap();
    let twice_edge = twice.edge(u0_edge.id.as_str()).unwrap();
    assert_eq!(twice_edge.source, u0_edge.source);
    assert_eq!(twice_edge.target, u0_edge.target);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_commutativity(a in arb_graph("A"), b in arb_graph("B")) {
        let ab = merged(&[a.clone(), b.clone()]);
        let ba = merged(&[b, a]);
        prop_assert_eq!(&ab.graph, &ba.graph, "merge must be commutative");
        prop_assert_eq!(ab.metadata.conflicts, ba.metadata.conflicts);
        prop_assert_eq!(ab.metadata.advisories, ba.metadata.advisories);
    }

    #[test]
    fn prop_associativity(a in arb_graph("A"), b in arb_graph("B"), c in arb_graph("C")) {
        let ab = merged(&[a.clone(), b.clone()]).graph;
        let bc = merged(&[b.clone(), c.clone()]).graph;
        let left = merged(&[ab, c.clone()]).graph;
        let right = merged(&[a.clone(), bc]).graph;
        prop_assert_eq!(&left, &right, "merge must be associative");
        prop_assert_eq!(&left, &merged(&[a, b, c]).graph);
    }

    #[test]
    fn prop_associativity_with_empty(a in arb_graph("A"), b in arb_graph("B")) {
        let left = merged(&[merged(&[Graph::empty(), a.clone()]).graph, b.clone()]).graph;
        let right = merged(&[a, merged(&[b, Graph::empty()]).graph]).graph;
        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_idempotency(a in arb_graph("A")) {
        let once = merged(std::slice::from_ref(&a)).graph;
        let twice = merged(&[a.clone(), a]).graph;
        prop_assert_eq!(&twice, &once, "merge(A, A) must equal merge(A)");
        let again = merged(std::slice::from_ref(&once)).graph;
        prop_assert_eq!(again, once, "a merged graph is a fixpoint");
    }

    #[test]
    fn prop_determinism(a in arb_graph("A"), b in arb_graph("B"), c in arb_graph("C")) {
        let reference = canonical(&[a.clone(), b.clone(), c.clone()]);
        prop_assert_eq!(&canonical(&[c.clone(), a.clone(), b.clone()]), &reference);
        prop_assert_eq!(&canonical(&[b.clone(), c.clone(), a.clone()]), &reference);

        let parallel = Merger::new(MergeConfig::default().with_workers(3), SchemeRegistry::standard())
            .merge(&[a, b, c])
            .unwrap();
        prop_assert_eq!(parallel.graph.canonical_json().unwrap(), reference);
    }

    #[test]
    fn prop_referential_integrity(a in arb_graph("A"), b in arb_graph("B")) {
        let output = merged(&[a, b]);
        let ids: BTreeSet<_> = output.graph.nodes.iter().map(|n| &n.id).collect();
        prop_assert_eq!(ids.len(), output.graph.nodes.len());
        for edge in &output.graph.edges {
            prop_assert!(ids.contains(&edge.source), "dangling source {}", edge.source);
            prop_assert!(ids.contains(&edge.target), "dangling target {}", edge.target);
        }
        prop_assert_eq!(output.metadata.groups.len(), output.graph.nodes.len());
    }

    #[test]
    fn prop_no_silent_loss(a in arb_graph("A"), b in arb_graph("B")) {
        let output = merged(&[a.clone(), b.clone()]);
        for input in [&a, &b] {
            let label = input.meta.source_label();
            for node in &input.nodes {
                let id = output.metadata.node_for(&label, node.id.as_str());
                prop_assert!(id.is_some(), "{} lost", node.id);
                let merged_node = id.and_then(|id| output.graph.node(id.as_str()));
                prop_assert!(merged_node.is_some());
                let Some(merged_node) = merged_node else { continue };

                for identifier in &node.identifiers {
                    prop_assert!(merged_node.identifiers.contains(identifier));
                }
                for (key, value) in &node.properties {
                    let kept = merged_node.property(key).is_some_and(|v: &Value| v.same_as(value));
                    let flagged = merged_node.conflict_for(key).is_some();
                    prop_assert!(kept || flagged, "{}.{} silently dropped", node.id, key);
                }
            }
        }
    }
}
