//! Closed type tags and sensitivity levels.
//!
//! Node and edge types are closed enums with an `Extension` escape hatch.
//! They serialize as lowercase strings; extension types use an `x:` prefix.

use std::fmt;

use serde::{Deserialize, Serialize};

const EXTENSION_PREFIX: &str = "x:";

fn parse_tag<T: Clone>(
    kind: &str,
    value: &str,
    builtin: &[T],
    name_of: impl Fn(&T) -> &'static str,
    extension: impl FnOnce(String) -> T,
) -> Result<T, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{kind} type cannot be empty"));
    }

    let bytes = value.as_bytes();
    if bytes.len() >= EXTENSION_PREFIX.len()
        && bytes[..EXTENSION_PREFIX.len()].eq_ignore_ascii_case(EXTENSION_PREFIX.as_bytes())
    {
        let rest = value[EXTENSION_PREFIX.len()..].trim();
        if rest.is_empty() {
            return Err(format!("extension {kind} type cannot be empty"));
        }
        return Ok(extension(rest.to_string()));
    }

    builtin
        .iter()
        .find(|candidate| name_of(*candidate).eq_ignore_ascii_case(value))
        .cloned()
        .ok_or_else(|| {
            format!("unknown {kind} type: {value}. Use a built-in type or prefix extension types with x:<name>")
        })
}

/// Type tag of a node.
///
/// The derived order is the fixed order used when a merge group disagrees on
/// its type: the merged node keeps the smallest tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeType {
    /// A company, institution or other legal entity
    Organization,
    /// A physical site
    Facility,
    /// A product or material
    Good,
    /// A natural person
    Person,
    /// A certificate, audit or other attestation
    Attestation,
    /// A shipment or lot
    Consignment,
    /// An opaque stand-in for a redacted entity
    BoundaryRef,
    /// A producer-defined type
    Extension(String),
}

impl NodeType {
    const BUILTIN: [Self; 7] = [
        Self::Organization,
        Self::Facility,
        Self::Good,
        Self::Person,
        Self::Attestation,
        Self::Consignment,
        Self::BoundaryRef,
    ];

    fn builtin_name(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Facility => "facility",
            Self::Good => "good",
            Self::Person => "person",
            Self::Attestation => "attestation",
            Self::Consignment => "consignment",
            Self::BoundaryRef => "boundary_ref",
            Self::Extension(_) => "extension",
        }
    }
}

impl TryFrom<String> for NodeType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_tag("node", &value, &Self::BUILTIN, Self::builtin_name, Self::Extension)
    }
}

impl From<NodeType> for String {
    fn from(value: NodeType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension(name) => write!(f, "{EXTENSION_PREFIX}{name}"),
            other => f.write_str(other.builtin_name()),
        }
    }
}

/// Type tag of an edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EdgeType {
    Ownership,
    OperationalControl,
    LegalParentage,
    FormerIdentity,
    BeneficialOwnership,
    Supplies,
    Subcontracts,
    Tolls,
    Distributes,
    Brokers,
    Operates,
    Produces,
    ComposedOf,
    SellsTo,
    AttestedBy,
    /// Producer-declared equivalence assertion
    SameAs,
    /// A producer-defined type
    Extension(String),
}

impl EdgeType {
    const BUILTIN: [Self; 16] = [
        Self::Ownership,
        Self::OperationalControl,
        Self::LegalParentage,
        Self::FormerIdentity,
        Self::BeneficialOwnership,
        Self::Supplies,
        Self::Subcontracts,
        Self::Tolls,
        Self::Distributes,
        Self::Brokers,
        Self::Operates,
        Self::Produces,
        Self::ComposedOf,
        Self::SellsTo,
        Self::AttestedBy,
        Self::SameAs,
    ];

    fn builtin_name(&self) -> &'static str {
        match self {
            Self::Ownership => "ownership",
            Self::OperationalControl => "operational_control",
            Self::LegalParentage => "legal_parentage",
            Self::FormerIdentity => "former_identity",
            Self::BeneficialOwnership => "beneficial_ownership",
            Self::Supplies => "supplies",
            Self::Subcontracts => "subcontracts",
            Self::Tolls => "tolls",
            Self::Distributes => "distributes",
            Self::Brokers => "brokers",
            Self::Operates => "operates",
            Self::Produces => "produces",
            Self::ComposedOf => "composed_of",
            Self::SellsTo => "sells_to",
            Self::AttestedBy => "attested_by",
            Self::SameAs => "same_as",
            Self::Extension(_) => "extension",
        }
    }
}

impl TryFrom<String> for EdgeType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_tag("edge", &value, &Self::BUILTIN, Self::builtin_name, Self::Extension)
    }
}

impl From<EdgeType> for String {
    fn from(value: EdgeType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension(name) => write!(f, "{EXTENSION_PREFIX}{name}"),
            other => f.write_str(other.builtin_name()),
        }
    }
}

/// How widely a piece of data may be shared. Ordered least to most
/// restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Public,
    Restricted,
    Confidential,
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Restricted => write!(f, "restricted"),
            Self::Confidential => write!(f, "confidential"),
        }
    }
}

/// Audience a graph is prepared for.
///
/// Ordered by how far the graph may travel: a `Public` graph may go anywhere,
/// an `Internal` graph must stay with its producer. Merging keeps the maximum,
/// i.e. the most restrictive distribution among the inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclosureScope {
    Public,
    Partner,
    Internal,
}

impl DisclosureScope {
    /// Whether data of the given sensitivity may appear at this scope.
    #[must_use]
    pub const fn permits(self, sensitivity: Sensitivity) -> bool {
        match self {
            Self::Internal => true,
            Self::Partner => !matches!(sensitivity, Sensitivity::Confidential),
            Self::Public => matches!(sensitivity, Sensitivity::Public),
        }
    }
}

impl fmt::Display for DisclosureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Partner => write!(f, "partner"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// How an identifier was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Reported,
    Inferred,
    #[default]
    Unverified,
}
