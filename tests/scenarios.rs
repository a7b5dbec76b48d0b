use std::collections::BTreeSet;

use netmerge::merge::ElementRef;
use netmerge::{
    merge, redact, DisclosureScope, Edge, EdgeType, Graph, Identifier, Merger, Node, NodeType, PropertyPath,
    RedactionPolicy, SchemeRegistry, Sensitivity, Value,
};

const LEI_X: &str = "5493001KJTIIGC8Y1R12";
const LEI_BUYER: &str = "529900T8BM49AURSDO55";

fn lei(value: &str) -> Identifier {
    Identifier::new("lei", value)
}

fn sources(labels: &[&str]) -> BTreeSet<String> {
    labels.iter().map(|s| (*s).to_string()).collect()
}

#[test]
fn shared_lei_merges_into_one_node() {
    let a = Graph::new("A").with_node(
        Node::new("a1", NodeType::Organization)
            .with_identifier(lei(LEI_X))
            .with_property("name", "Acme Steel"),
    );
    let b = Graph::new("B").with_node(
        Node::new("b1", NodeType::Organization)
            .with_identifier(lei(LEI_X))
            .with_property("country", "DE"),
    );

    let output = merge(&[a, b]).unwrap();
    assert_eq!(output.graph.nodes.len(), 1);

    let node = &output.graph.nodes[0];
    assert_eq!(node.node_type, NodeType::Organization);
    assert_eq!(node.identifiers, vec![lei(LEI_X)]);
    assert_eq!(node.property("name").and_then(Value::as_string), Some("Acme Steel"));
    assert_eq!(node.property("country").and_then(Value::as_string), Some("DE"));
    assert!(node.conflicts.is_empty());

    assert_eq!(
        node.provenance.get(&PropertyPath::property("name")),
        Some(&sources(&["A"]))
    );
    assert_eq!(
        node.provenance.get(&PropertyPath::NodeType),
        Some(&sources(&["A", "B"]))
    );
    assert_eq!(output.metadata.groups.len(), 1);
    assert_eq!(output.metadata.groups[0].size, 2);
}

#[test]
fn disagreeing_revenue_is_left_unresolved() {
    let a = Graph::new("A").with_node(
        Node::new("a1", NodeType::Organization)
            .with_identifier(lei(LEI_X))
            .with_property("revenue", 100),
    );
    let b = Graph::new("B").with_node(
        Node::new("b1", NodeType::Organization)
            .with_identifier(lei(LEI_X))
            .with_property("revenue", 200),
    );

    let output = merge(&[a, b]).unwrap();
    let node = &output.graph.nodes[0];
    assert!(node.property("revenue").is_none());

    let conflict = node.conflict_for("revenue").unwrap();
    assert_eq!(conflict.values.len(), 2);
    let attributed: Vec<_> = conflict
        .values
        .iter()
        .map(|v| (v.value.clone(), v.sources.clone()))
        .collect();
    assert!(attributed.contains(&(serde_json::json!(100), sources(&["A"]))));
    assert!(attributed.contains(&(serde_json::json!(200), sources(&["B"]))));

    assert_eq!(output.metadata.conflicts.len(), 1);
    assert_eq!(output.metadata.conflicts[0].element, ElementRef::Node(node.id.clone()));
    assert_eq!(output.metadata.conflicts[0].path, PropertyPath::property("revenue"));
}

#[test]
fn numerically_equal_revenue_agrees() {
    let a = Graph::new("A").with_node(
        Node::new("a1", NodeType::Organization)
            .with_identifier(lei(LEI_X))
            .with_property("revenue", 100),
    );
    let b = Graph::new("B").with_node(
        Node::new("b1", NodeType::Organization)
            .with_identifier(lei(LEI_X))
            .with_property("revenue", 100.0),
    );
    let output = merge(&[a, b]).unwrap();
    let node = &output.graph.nodes[0];
    assert!(node.conflicts.is_empty());
    assert!(node.property("revenue").unwrap().same_as(&Value::Int(100)));
}

#[test]
fn annulled_lei_does_not_merge() {
    let annulled = lei(LEI_X).with_entity_status("ANNULLED");
    let a = Graph::new("A").with_node(Node::new("a1", NodeType::Organization).with_identifier(annulled.clone()));
    let b = Graph::new("B").with_node(Node::new("b1", NodeType::Organization).with_identifier(annulled.clone()));
    let c = Graph::new("C").with_node(Node::new("c1", NodeType::Organization).with_identifier(lei(LEI_X)));

    let output = merge(&[a, b, c]).unwrap();
    assert_eq!(output.graph.nodes.len(), 3);
    assert!(output.graph.nodes.iter().all(|n| n.identifiers.len() == 1));
    assert_eq!(
        output.graph.nodes.iter().filter(|n| n.identifiers[0] == annulled).count(),
        2
    );
}

fn registry_graph(label: &str, id: &str, name: &str) -> Graph {
    Graph::new(label).with_node(
        Node::new(id, NodeType::Organization)
            .with_identifier(Identifier::new("nat-reg", "HRB 86891").with_authority("RA000548"))
            .with_property("name", name)
            .with_property(format!("seen_by_{label}"), true),
    )
}

#[test]
fn pairwise_merge_order_does_not_matter() {
    let files = [
        registry_graph("A", "x", "Borealis GmbH"),
        registry_graph("B", "y", "Borealis GmbH"),
        registry_graph("C", "z", "Borealis"),
    ];
    let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

    let results: Vec<Graph> = orders
        .iter()
        .map(|[i, j, k]| {
            let first = merge(&[files[*i].clone(), files[*j].clone()]).unwrap().graph;
            merge(&[first, files[*k].clone()]).unwrap().graph
        })
        .collect();

    for result in &results[1..] {
        assert_eq!(result, &results[0]);
    }
    assert_eq!(results[0].nodes.len(), 1);

    let node = &results[0].nodes[0];
    let name = node.conflict_for("name").unwrap();
    assert_eq!(name.values.len(), 2);
    assert!(name.values.iter().any(|v| v.sources == sources(&["A", "B"])));
    for label in ["A", "B", "C"] {
        assert!(node.property(&format!("seen_by_{label}")).is_some());
    }

    let direct = merge(&files).unwrap().graph;
    assert_eq!(direct, results[0]);
}

#[test]
fn empty_graph_is_identity() {
    let a = Graph::new("A")
        .with_node(Node::new("a1", NodeType::Organization).with_identifier(lei(LEI_X)))
        .with_node(Node::new("a2", NodeType::Facility).with_property("name", "Plant 2"))
        .with_edge(Edge::new("e1", EdgeType::Operates, "a1", "a2"));

    let alone = merge(std::slice::from_ref(&a)).unwrap().graph;
    let left = merge(&[Graph::empty(), a.clone()]).unwrap().graph;
    let right = merge(&[a.clone(), Graph::empty()]).unwrap().graph;

    assert_eq!(left, alone);
    assert_eq!(right, alone);
    assert_eq!(alone.nodes.len(), a.nodes.len());
    assert_eq!(alone.edges.len(), a.edges.len());
    assert_eq!(alone.meta.sources, a.meta.sources);
}

fn supplier_file(label: &str) -> Graph {
    Graph::new(label)
        .with_node(Node::new("buyer", NodeType::Organization).with_identifier(lei(LEI_BUYER)))
        .with_node(
            Node::new("secret-mill", NodeType::Organization)
                .with_sensitivity(Sensitivity::Confidential)
                .with_identifier(lei(LEI_X)),
        )
        .with_edge(Edge::new("e1", EdgeType::Supplies, "secret-mill", "buyer").with_property("commodity", "7208"))
}

#[test]
fn independently_redacted_views_do_not_correlate() {
    let registry = SchemeRegistry::standard();
    let policy = RedactionPolicy::new(DisclosureScope::Public);

    let view_a = redact(&supplier_file("A"), &policy, &registry).unwrap();
    let view_b = redact(&supplier_file("B"), &policy, &registry).unwrap();
    assert_ne!(view_a.meta.salt, view_b.meta.salt);

    let ref_a = view_a.node("secret-mill").unwrap();
    let ref_b = view_b.node("secret-mill").unwrap();
    assert_eq!(ref_a.node_type, NodeType::BoundaryRef);
    assert!(ref_a.properties.is_empty());
    assert_ne!(ref_a.identifiers[0].value, ref_b.identifiers[0].value);
    assert_eq!(view_a.edges.len(), 1);

    let merged = Merger::default().merge(&[view_a, view_b]).unwrap();
    let boundary_refs = merged
        .graph
        .nodes
        .iter()
        .filter(|n| n.node_type == NodeType::BoundaryRef)
        .count();
    assert_eq!(boundary_refs, 2);
    assert_eq!(merged.graph.nodes.len(), 3);
    assert_eq!(merged.graph.edges.len(), 2);
    assert_eq!(merged.graph.meta.salt, None);
}
