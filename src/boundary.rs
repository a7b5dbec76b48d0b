//! Boundary references and disclosure-scoped redaction.
//!
//! A boundary reference is an opaque stand-in for an entity whose content is
//! not disclosed. Its token is a BLAKE3 digest over the entity's sorted
//! public canonical identifiers followed by a per-file salt. An entity with
//! no public identifier gets a fresh random token instead; hashing the salt
//! alone would collapse all such entities into one reference.
//!
//! Independent salts make references from different files uncorrelatable,
//! so redacted views produced with different salts never merge.

use std::collections::BTreeSet;
use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::canonical::canonical_id;
use crate::error::{MergeError, MergeResult, SaltError};
use crate::model::{DisclosureScope, Graph, Identifier, Node, NodeId, NodeType, Sensitivity};
use crate::scheme::{SchemeRegistry, OPAQUE_SCHEME};
use crate::validation::check_structure;

const SALT_LEN: usize = 32;
const TOKEN_LEN: usize = 32;

/// Per-file random salt, serialized as lowercase hex.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileSalt([u8; SALT_LEN]);

impl FileSalt {
    /// Draws a salt from the operating system RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a 64-character hex salt.
    ///
    /// # Errors
    ///
    /// Returns `SaltError` for non-hex input or the wrong length.
    pub fn from_hex(value: &str) -> Result<Self, SaltError> {
        let bytes = hex::decode(value.trim()).map_err(|e| SaltError::InvalidHex { reason: e.to_string() })?;
        let array: [u8; SALT_LEN] = bytes.as_slice().try_into().map_err(|_| SaltError::InvalidLength {
            expected: SALT_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

impl fmt::Debug for FileSalt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSalt({})", self.to_hex())
    }
}

impl TryFrom<String> for FileSalt {
    type Error = SaltError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<FileSalt> for String {
    fn from(value: FileSalt) -> Self {
        value.to_hex()
    }
}

/// How a boundary token was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Salted digest of public identifiers; stable for a given salt.
    Hashed,
    /// Fresh random bytes; unique per call.
    Random,
}

/// Opaque token standing in for an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryToken {
    /// 64 lowercase hex characters.
    pub value: String,
    pub kind: TokenKind,
}

/// Mints boundary references for one file.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryRefGenerator<'a> {
    salt: &'a FileSalt,
    registry: &'a SchemeRegistry,
}

impl<'a> BoundaryRefGenerator<'a> {
    #[must_use]
    pub const fn new(salt: &'a FileSalt, registry: &'a SchemeRegistry) -> Self {
        Self { salt, registry }
    }

    /// Sorted, de-duplicated canonical strings of the node's publicly
    /// disclosable, matchable identifiers.
    #[must_use]
    pub fn disclosable_ids(&self, node: &Node) -> Vec<String> {
        node.identifiers
            .iter()
            .filter(|id| !self.registry.is_private(&id.scheme))
            .filter(|id| self.registry.effective_sensitivity(id, &node.node_type) == Sensitivity::Public)
            .map(|id| canonical_id(id, self.registry))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Token for `node`.
    ///
    /// # Examples
    ///
    /// ```
    /// use netmerge::boundary::{BoundaryRefGenerator, FileSalt, TokenKind};
    /// use netmerge::{Identifier, Node, NodeType, SchemeRegistry};
    ///
    /// let salt = FileSalt::generate();
    /// let registry = SchemeRegistry::standard();
    /// let generator = BoundaryRefGenerator::new(&salt, &registry);
    ///
    /// let named = Node::new("a", NodeType::Organization)
    ///     .with_identifier(Identifier::new("lei", "5493001KJTIIGC8Y1R12"));
    /// let token = generator.reference_for(&named);
    /// assert_eq!(token.kind, TokenKind::Hashed);
    /// assert_eq!(token, generator.reference_for(&named));
    ///
    /// let anonymous = Node::new("b", NodeType::Organization);
    /// assert_ne!(generator.reference_for(&anonymous), generator.reference_for(&anonymous));
    /// ```
    #[must_use]
    pub fn reference_for(&self, node: &Node) -> BoundaryToken {
        let ids = self.disclosable_ids(node);
        if ids.is_empty() {
            let mut bytes = [0u8; TOKEN_LEN];
            OsRng.fill_bytes(&mut bytes);
            return BoundaryToken {
                value: hex::encode(bytes),
                kind: TokenKind::Random,
            };
        }

        let mut hasher = blake3::Hasher::new();
        hasher.update(ids.join("\n").as_bytes());
        hasher.update(self.salt.as_bytes());
        BoundaryToken {
            value: hasher.finalize().to_hex().to_string(),
            kind: TokenKind::Hashed,
        }
    }

    /// Boundary-reference node replacing `node`: same id, a single public
    /// `opaque` identifier, nothing else.
    #[must_use]
    pub fn stand_in(&self, node: &Node) -> Node {
        let token = self.reference_for(node);
        Node::new(node.id.clone(), NodeType::BoundaryRef)
            .with_identifier(Identifier::new(OPAQUE_SCHEME, token.value).with_sensitivity(Sensitivity::Public))
    }
}

/// Target audience plus nodes that must be hidden regardless of sensitivity.
#[derive(Debug, Clone)]
pub struct RedactionPolicy {
    pub scope: DisclosureScope,
    pub redact: BTreeSet<NodeId>,
}

impl RedactionPolicy {
    #[must_use]
    pub fn new(scope: DisclosureScope) -> Self {
        Self {
            scope,
            redact: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_redacted(mut self, id: impl Into<NodeId>) -> Self {
        self.redact.insert(id.into());
        self
    }

    /// What happens to `node` under this policy.
    #[must_use]
    pub fn action_for(&self, node: &Node) -> NodeAction {
        if node.node_type == NodeType::BoundaryRef {
            return NodeAction::Retain;
        }
        if node.node_type == NodeType::Person && self.scope == DisclosureScope::Public {
            return NodeAction::Omit;
        }
        if self.redact.contains(&node.id) || !self.scope.permits(node.effective_sensitivity()) {
            return NodeAction::Replace;
        }
        NodeAction::Retain
    }
}

/// Fate of a node during redaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    Retain,
    Replace,
    Omit,
}

/// Produces a disclosure-scoped view of `graph`.
///
/// Retained nodes keep only identifiers the scope permits. Replaced nodes
/// become boundary references. Edges touching omitted nodes, and edges
/// between two boundary references, are dropped. The graph's salt is reused
/// when present, otherwise a fresh one is generated and recorded.
///
/// # Errors
///
/// Returns `MergeError::InvalidInput` when the graph is structurally
/// invalid.
#[instrument(skip_all, fields(source = %graph.meta.source_label(), scope = %policy.scope))]
pub fn redact(graph: &Graph, policy: &RedactionPolicy, registry: &SchemeRegistry) -> MergeResult<Graph> {
    let errors = check_structure(graph);
    if !errors.is_empty() {
        return Err(MergeError::InvalidInput {
            source_label: graph.meta.source_label(),
            errors,
        });
    }

    let salt = graph.meta.salt.clone().unwrap_or_else(FileSalt::generate);
    let generator = BoundaryRefGenerator::new(&salt, registry);

    let mut replaced: BTreeSet<&NodeId> = BTreeSet::new();
    let mut omitted: BTreeSet<&NodeId> = BTreeSet::new();
    let mut nodes = Vec::with_capacity(graph.nodes.len());

    for node in &graph.nodes {
        match policy.action_for(node) {
            NodeAction::Retain => {
                let mut kept = node.clone();
                kept.identifiers
                    .retain(|id| policy.scope.permits(registry.effective_sensitivity(id, &node.node_type)));
                nodes.push(kept);
            }
            NodeAction::Replace => {
                replaced.insert(&node.id);
                nodes.push(generator.stand_in(node));
            }
            NodeAction::Omit => {
                omitted.insert(&node.id);
            }
        }
    }

    let edges: Vec<_> = graph
        .edges
        .iter()
        .filter(|e| !omitted.contains(&e.source) && !omitted.contains(&e.target))
        .filter(|e| !(replaced.contains(&e.source) && replaced.contains(&e.target)))
        .cloned()
        .collect();

    debug!(
        replaced = replaced.len(),
        omitted = omitted.len(),
        edges_dropped = graph.edges.len() - edges.len(),
        "redaction complete"
    );

    let mut meta = graph.meta.clone();
    meta.disclosure_scope = Some(policy.scope);
    meta.salt = Some(salt);
    Ok(Graph { meta, nodes, edges })
}
