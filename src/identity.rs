//! Identity predicate and identifier index.
//!
//! Two nodes denote the same entity when they share an identifier record
//! with equal scheme, value and authority whose validity windows overlap.
//! Private-scheme identifiers and annulled LEIs never link. Candidate pairs come from an index
//! keyed on the canonical identity string, so only identifiers that already
//! share a key are compared.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_id;
use crate::model::{Edge, EdgeType, Handle, Identifier, Node};
use crate::scheme::SchemeRegistry;

/// Result of comparing two identifier records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Same entity. `unbounded` is set when only one record carried a
    /// validity bound, so overlap was assumed.
    Linked { unbounded: bool },
    /// Same identifier, but the validity windows are disjoint.
    TemporalMismatch,
    NotLinked,
}

impl MatchOutcome {
    #[must_use]
    pub const fn is_linked(self) -> bool {
        matches!(self, Self::Linked { .. })
    }
}

/// Compares two identifier records.
///
/// # Examples
///
/// ```
/// use netmerge::{identity::identifiers_match, Identifier, SchemeRegistry};
///
/// let registry = SchemeRegistry::standard();
/// let a = Identifier::new("lei", "5493001KJTIIGC8Y1R12");
/// let b = Identifier::new("LEI", " 5493001KJTIIGC8Y1R12");
/// assert!(identifiers_match(&a, &b, &registry).is_linked());
///
/// let p = Identifier::new("internal", "C-1");
/// assert!(!identifiers_match(&p, &p, &registry).is_linked());
/// ```
#[must_use]
pub fn identifiers_match(a: &Identifier, b: &Identifier, registry: &SchemeRegistry) -> MatchOutcome {
    if !is_matchable(a, registry) || !is_matchable(b, registry) {
        return MatchOutcome::NotLinked;
    }
    if a.scheme_key() != b.scheme_key() {
        return MatchOutcome::NotLinked;
    }
    if a.value.trim() != b.value.trim() {
        return MatchOutcome::NotLinked;
    }

    match (&a.authority, &b.authority) {
        (Some(aa), Some(ba)) if !aa.trim().eq_ignore_ascii_case(ba.trim()) => return MatchOutcome::NotLinked,
        (Some(_), None) | (None, Some(_)) => return MatchOutcome::NotLinked,
        _ => {}
    }

    match (a.has_temporal_bounds(), b.has_temporal_bounds()) {
        (false, false) => MatchOutcome::Linked { unbounded: false },
        (true, false) | (false, true) => MatchOutcome::Linked { unbounded: true },
        (true, true) => {
            let (Some(wa), Some(wb)) = (a.validity, b.validity) else {
                return MatchOutcome::Linked { unbounded: true };
            };
            if wa.overlaps(&wb) {
                MatchOutcome::Linked { unbounded: false }
            } else {
                MatchOutcome::TemporalMismatch
            }
        }
    }
}

fn is_matchable(identifier: &Identifier, registry: &SchemeRegistry) -> bool {
    !registry.is_private(&identifier.scheme) && !identifier.is_annulled()
}

/// Position of one identifier record inside the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexEntry {
    /// Node holding the identifier.
    pub handle: Handle,
    /// Index into the node's identifier list.
    pub position: usize,
}

/// Map from canonical identity string to the identifiers carrying it.
#[derive(Debug, Clone, Default)]
pub struct IdentifierIndex {
    buckets: BTreeMap<String, Vec<IndexEntry>>,
}

impl IdentifierIndex {
    /// Indexes every matchable identifier of the given nodes.
    pub fn build<'a, I>(nodes: I, registry: &SchemeRegistry) -> Self
    where
        I: IntoIterator<Item = (Handle, &'a Node)>,
    {
        let mut buckets: BTreeMap<String, Vec<IndexEntry>> = BTreeMap::new();
        for (handle, node) in nodes {
            for (position, identifier) in node.identifiers.iter().enumerate() {
                if !is_matchable(identifier, registry) {
                    continue;
                }
                buckets
                    .entry(canonical_id(identifier, registry))
                    .or_default()
                    .push(IndexEntry { handle, position });
            }
        }
        Self { buckets }
    }

    /// Number of distinct canonical strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    #[must_use]
    pub fn bucket(&self, key: &str) -> Option<&[IndexEntry]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Buckets that span more than one node; only these can produce links.
    #[must_use]
    pub fn candidate_buckets(&self) -> Vec<(&str, &[IndexEntry])> {
        self.buckets
            .iter()
            .filter(|(_, entries)| entries.iter().any(|e| e.handle != entries[0].handle))
            .map(|(key, entries)| (key.as_str(), entries.as_slice()))
            .collect()
    }
}

/// Advisory-worthy observation about a compared pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairFinding {
    UnboundedValidity,
    TemporalMismatch,
}

/// Links and findings produced by scanning one bucket.
#[derive(Debug, Clone, Default)]
pub struct BucketScan {
    pub links: Vec<(Handle, Handle)>,
    pub findings: Vec<(PairFinding, IndexEntry, IndexEntry)>,
}

/// Compares every pair of distinct nodes within one bucket.
pub fn scan_bucket<'a, F>(entries: &[IndexEntry], lookup: F, registry: &SchemeRegistry) -> BucketScan
where
    F: Fn(IndexEntry) -> Option<&'a Identifier>,
{
    let mut scan = BucketScan::default();
    for (i, left) in entries.iter().enumerate() {
        let Some(a) = lookup(*left) else { continue };
        for right in &entries[i + 1..] {
            if left.handle == right.handle {
                continue;
            }
            let Some(b) = lookup(*right) else { continue };
            let (lo, hi) = if left <= right { (*left, *right) } else { (*right, *left) };
            match identifiers_match(a, b, registry) {
                MatchOutcome::Linked { unbounded } => {
                    scan.links.push((lo.handle, hi.handle));
                    if unbounded {
                        scan.findings.push((PairFinding::UnboundedValidity, lo, hi));
                    }
                }
                MatchOutcome::TemporalMismatch => {
                    scan.findings.push((PairFinding::TemporalMismatch, lo, hi));
                }
                MatchOutcome::NotLinked => {}
            }
        }
    }
    scan
}

/// Confidence carried by an equivalence assertion. Ordered weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquivalenceConfidence {
    #[default]
    Possible,
    Probable,
    Definite,
}

impl EquivalenceConfidence {
    /// Parses a confidence level case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("definite") {
            Some(Self::Definite)
        } else if value.eq_ignore_ascii_case("probable") {
            Some(Self::Probable)
        } else if value.eq_ignore_ascii_case("possible") {
            Some(Self::Possible)
        } else {
            None
        }
    }

    /// Confidence of a `same_as` edge; None for every other edge type.
    /// A missing or unreadable `confidence` property counts as `Possible`.
    #[must_use]
    pub fn of_edge(edge: &Edge) -> Option<Self> {
        if edge.edge_type != EdgeType::SameAs {
            return None;
        }
        Some(
            edge.property("confidence")
                .and_then(|v| v.as_string())
                .and_then(Self::parse)
                .unwrap_or_default(),
        )
    }
}
