//! Source attribution, conflict records and perspective values.
//!
//! Everything in here is keyed by source labels (the `sources` of the graph
//! a value came from), never by input position, so that attribution survives
//! re-merging in any order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Location of a reconciled value inside a node or edge.
///
/// Serialized as a dotted string: `type`, `validity`, `properties.<k>...`,
/// `extensions.<k>...`. Segments escape `%` and `.` with percent encoding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PropertyPath {
    /// The node type tag.
    NodeType,
    /// The edge validity window.
    Validity,
    /// A typed property, possibly nested into structured values.
    Property(Vec<String>),
    /// An extension value, possibly nested.
    Extension(Vec<String>),
}

impl PropertyPath {
    #[must_use]
    pub fn property(key: impl Into<String>) -> Self {
        Self::Property(vec![key.into()])
    }

    #[must_use]
    pub fn extension(key: impl Into<String>) -> Self {
        Self::Extension(vec![key.into()])
    }

    /// Path segments below the root; empty for `NodeType` and `Validity`.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        match self {
            Self::Property(segments) | Self::Extension(segments) => segments,
            Self::NodeType | Self::Validity => &[],
        }
    }

    /// Top-level property or extension key.
    #[must_use]
    pub fn root_key(&self) -> Option<&str> {
        self.segments().first().map(String::as_str)
    }

    /// Extends this path by one segment. `NodeType` and `Validity` are leaves
    /// and are returned unchanged.
    #[must_use]
    pub fn child(&self, key: &str) -> Self {
        match self {
            Self::Property(segments) => {
                let mut segments = segments.clone();
                segments.push(key.to_string());
                Self::Property(segments)
            }
            Self::Extension(segments) => {
                let mut segments = segments.clone();
                segments.push(key.to_string());
                Self::Extension(segments)
            }
            leaf => leaf.clone(),
        }
    }

    /// True when `other` lies strictly below this path.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Property(a), Self::Property(b)) | (Self::Extension(a), Self::Extension(b)) => {
                b.len() > a.len() && b.starts_with(a)
            }
            _ => false,
        }
    }
}

fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for ch in segment.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '.' => out.push_str("%2E"),
            c => out.push(c),
        }
    }
    out
}

fn decode_segment(segment: &str) -> Result<String, String> {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = rest.get(pos + 1..pos + 3).ok_or_else(|| format!("truncated escape in '{segment}'"))?;
        match code {
            "25" => out.push('%'),
            "2E" | "2e" => out.push('.'),
            other => return Err(format!("unknown escape %{other} in '{segment}'")),
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Ok(out)
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (root, segments) = match self {
            Self::NodeType => return f.write_str("type"),
            Self::Validity => return f.write_str("validity"),
            Self::Property(segments) => ("properties", segments),
            Self::Extension(segments) => ("extensions", segments),
        };
        f.write_str(root)?;
        for segment in segments {
            write!(f, ".{}", encode_segment(segment))?;
        }
        Ok(())
    }
}

impl TryFrom<String> for PropertyPath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mut parts = value.split('.');
        let root = parts.next().unwrap_or_default();
        let segments = parts.map(decode_segment).collect::<Result<Vec<_>, _>>()?;
        match (root, segments.is_empty()) {
            ("type", true) => Ok(Self::NodeType),
            ("validity", true) => Ok(Self::Validity),
            ("properties", false) => Ok(Self::Property(segments)),
            ("extensions", false) => Ok(Self::Extension(segments)),
            _ => Err(format!("invalid property path: {value}")),
        }
    }
}

impl From<PropertyPath> for String {
    fn from(value: PropertyPath) -> Self {
        value.to_string()
    }
}

/// Per-path source attribution.
///
/// A missing entry means the value is attributed to every source of the graph
/// that carries it. Merged output always fills every entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Provenance(BTreeMap<PropertyPath, BTreeSet<String>>);

impl Provenance {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, path: &PropertyPath) -> Option<&BTreeSet<String>> {
        self.0.get(path)
    }

    /// Sources for `path`, falling back to the graph's sources.
    #[must_use]
    pub fn sources_for<'a>(&'a self, path: &PropertyPath, graph_sources: &'a BTreeSet<String>) -> &'a BTreeSet<String> {
        self.0.get(path).filter(|s| !s.is_empty()).unwrap_or(graph_sources)
    }

    pub fn insert(&mut self, path: PropertyPath, sources: BTreeSet<String>) {
        self.0.insert(path, sources);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyPath, &BTreeSet<String>)> {
        self.0.iter()
    }
}

/// One competing value of a conflict, with the sources asserting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictValue {
    pub value: Json,
    pub sources: BTreeSet<String>,
}

/// Competing values for one path that could not be reconciled.
///
/// The conflicted value itself is left unresolved on the element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyConflict {
    pub path: PropertyPath,
    pub values: Vec<ConflictValue>,
}

/// A value that is only meaningful from one reporting entity's viewpoint,
/// e.g. a supplier tier. Kept from every source, never conflict-flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveValue {
    pub property: String,
    pub value: Json,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporting_entity: Option<String>,
    pub sources: BTreeSet<String>,
}
