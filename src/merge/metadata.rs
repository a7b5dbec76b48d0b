//! Merge metadata: groups, flattened conflicts and advisories.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::identity::EquivalenceConfidence;
use crate::model::{ConflictValue, EdgeId, Graph, NodeId, NodeType, PropertyConflict, PropertyPath};

/// An input element, named by the graph it came from and its id there.
///
/// Origins order by label, then by id with digit runs compared as numbers,
/// so generated ids keep their numeric order when a merged graph is merged
/// again (`n-9` before `n-10`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    pub source_label: String,
    pub id: String,
}

impl Origin {
    #[must_use]
    pub fn new(source_label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source_label: source_label.into(),
            id: id.into(),
        }
    }
}

impl Ord for Origin {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source_label
            .cmp(&other.source_label)
            .then_with(|| natural_cmp(&self.id, &other.id))
    }
}

impl PartialOrd for Origin {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compares strings with every run of ASCII digits read as one number.
/// Strings that only differ in leading zeros fall back to byte order.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut x, mut y) = (a.as_bytes(), b.as_bytes());
    loop {
        match (x.first(), y.first()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(c), Some(d)) if c.is_ascii_digit() && d.is_ascii_digit() => {
                let (run_x, rest_x) = digit_run(x);
                let (run_y, rest_y) = digit_run(y);
                let ord = run_x.len().cmp(&run_y.len()).then_with(|| run_x.cmp(run_y));
                if ord != Ordering::Equal {
                    return ord;
                }
                x = rest_x;
                y = rest_y;
            }
            (Some(c), Some(d)) => {
                if c != d {
                    return c.cmp(d);
                }
                x = &x[1..];
                y = &y[1..];
            }
        }
    }
}

/// Leading digit run without its leading zeros, and the remainder.
fn digit_run(s: &[u8]) -> (&[u8], &[u8]) {
    let len = s.iter().take_while(|b| b.is_ascii_digit()).count();
    let (run, rest) = s.split_at(len);
    let zeros = run.iter().take_while(|b| **b == b'0').count();
    (&run[zeros..], rest)
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source_label, self.id)
    }
}

/// Non-fatal finding raised during a merge.
///
/// Advisories never change the merge result; they flag places where a human
/// should look.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// A merge group reached the configured size threshold.
    OversizedGroup {
        node: NodeId,
        size: usize,
        threshold: usize,
        sources: BTreeSet<String>,
    },
    /// Two records share an identifier but their validity windows are
    /// disjoint, so they were not linked through it.
    TemporalMismatch {
        identifier: String,
        members: Vec<Origin>,
    },
    /// A link was made although only one record carried validity bounds.
    UnboundedValidity {
        identifier: String,
        members: Vec<Origin>,
    },
    /// Scheme missing from the registry. Raised once per scheme.
    UnrecognizedScheme {
        scheme: String,
        sources: BTreeSet<String>,
    },
    /// Value does not match the registered format of its scheme.
    MalformedIdentifier {
        scheme: String,
        value: String,
        origin: Origin,
    },
    /// Members of one group claimed different node types.
    TypeMismatch { node: NodeId, types: Vec<NodeType> },
}

impl Advisory {
    /// Short machine-readable name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OversizedGroup { .. } => "oversized_group",
            Self::TemporalMismatch { .. } => "temporal_mismatch",
            Self::UnboundedValidity { .. } => "unbounded_validity",
            Self::UnrecognizedScheme { .. } => "unrecognized_scheme",
            Self::MalformedIdentifier { .. } => "malformed_identifier",
            Self::TypeMismatch { .. } => "type_mismatch",
        }
    }

    /// Emits the advisory as a `warn` event.
    pub fn log(&self) {
        match self {
            Self::OversizedGroup { node, size, threshold, .. } => {
                warn!(%node, size, threshold, "oversized merge group");
            }
            Self::TemporalMismatch { identifier, members } => {
                warn!(%identifier, members = members.len(), "identifier shared across disjoint validity windows");
            }
            Self::UnboundedValidity { identifier, members } => {
                warn!(%identifier, members = members.len(), "linked on identifier with one-sided validity");
            }
            Self::UnrecognizedScheme { scheme, sources } => {
                warn!(%scheme, sources = sources.len(), "unrecognized identifier scheme");
            }
            Self::MalformedIdentifier { scheme, value, origin } => {
                warn!(%scheme, %value, %origin, "identifier value does not match scheme format");
            }
            Self::TypeMismatch { node, types } => {
                warn!(%node, types = types.len(), "merge group disagrees on node type");
            }
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OversizedGroup { node, size, .. } => write!(f, "{node}: group of {size} nodes"),
            Self::TemporalMismatch { identifier, .. } => write!(f, "{identifier}: disjoint validity"),
            Self::UnboundedValidity { identifier, .. } => write!(f, "{identifier}: one-sided validity"),
            Self::UnrecognizedScheme { scheme, .. } => write!(f, "unrecognized scheme '{scheme}'"),
            Self::MalformedIdentifier { scheme, value, origin } => {
                write!(f, "{origin}: malformed {scheme} value '{value}'")
            }
            Self::TypeMismatch { node, types } => {
                let names: Vec<_> = types.iter().map(ToString::to_string).collect();
                write!(f, "{node}: types disagree ({})", names.join(", "))
            }
        }
    }
}

/// One output node and the input nodes merged into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub node: NodeId,
    pub size: usize,
    pub members: Vec<Origin>,
}

/// Output element an unresolved conflict belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ElementRef {
    Node(NodeId),
    Edge(EdgeId),
}

/// A conflict flattened out of the output graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub element: ElementRef,
    pub path: PropertyPath,
    pub values: Vec<ConflictValue>,
}

impl ConflictEntry {
    #[must_use]
    pub fn new(element: ElementRef, conflict: &PropertyConflict) -> Self {
        Self {
            element,
            path: conflict.path.clone(),
            values: conflict.values.clone(),
        }
    }
}

/// An equivalence assertion consumed as a merge link. The edge leaves the
/// output graph; this record keeps it as evidence for the merge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppliedEquivalence {
    /// The `same_as` edge.
    pub edge: Origin,
    pub source: Origin,
    pub target: Origin,
    pub confidence: EquivalenceConfidence,
    /// Output node both endpoints ended up in.
    pub node: NodeId,
}

/// Everything a merge reports besides the graph itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeMetadata {
    pub sources: BTreeSet<String>,
    pub reporting_entities: BTreeSet<String>,
    /// Set only when every input agrees on a single reporting entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporting_entity: Option<String>,
    pub groups: Vec<GroupSummary>,
    pub conflicts: Vec<ConflictEntry>,
    pub oversized_group_count: usize,
    /// Equivalence assertions consumed as merge links, in edge order.
    pub equivalences: Vec<AppliedEquivalence>,
    pub input_count: usize,
    pub deduplicated_inputs: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub advisories: Vec<Advisory>,
    /// Wall-clock time of the merge. Not part of the merge result proper.
    pub merged_at: DateTime<Utc>,
}

impl MergeMetadata {
    /// Metadata for a merge of zero inputs.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            sources: BTreeSet::new(),
            reporting_entities: BTreeSet::new(),
            reporting_entity: None,
            groups: Vec::new(),
            conflicts: Vec::new(),
            oversized_group_count: 0,
            equivalences: Vec::new(),
            input_count: 0,
            deduplicated_inputs: 0,
            node_count: 0,
            edge_count: 0,
            advisories: Vec::new(),
            merged_at: Utc::now(),
        }
    }

    /// Advisories of the given kind.
    pub fn advisories_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Advisory> + 'a {
        self.advisories.iter().filter(move |a| a.kind() == kind)
    }

    /// Output node an input node ended up in.
    #[must_use]
    pub fn node_for(&self, source_label: &str, id: &str) -> Option<&NodeId> {
        self.groups
            .iter()
            .find(|g| g.members.iter().any(|m| m.source_label == source_label && m.id == id))
            .map(|g| &g.node)
    }
}

/// Result of a merge.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub graph: Graph,
    pub metadata: MergeMetadata,
}
