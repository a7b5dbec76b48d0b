//! Identifier scheme registry.
//!
//! The registry is an immutable table passed explicitly into the identity
//! predicate, the reconcilers and the boundary generator. Nothing reads a
//! global vocabulary, so several registry versions can coexist.

use std::collections::BTreeMap;

use regex::Regex;

use crate::model::{Identifier, NodeType, Sensitivity};

/// Whether identifiers of a scheme may link nodes across files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchScope {
    /// Globally meaningful, e.g. LEI or DUNS.
    Global,
    /// Producer-private namespace; never used for cross-file matching.
    Private,
}

/// Declaration of one identifier scheme.
#[derive(Debug, Clone)]
pub struct SchemeSpec {
    pub name: String,
    pub scope: MatchScope,
    /// Whether `{authority}` is part of the canonical identity string.
    pub authority_in_canonical: bool,
    pub default_sensitivity: Sensitivity,
    /// Expected value format; a mismatch is an advisory, not an error.
    pub format: Option<Regex>,
}

impl SchemeSpec {
    /// A global scheme with public sensitivity and no format check.
    #[must_use]
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: MatchScope::Global,
            authority_in_canonical: false,
            default_sensitivity: Sensitivity::Public,
            format: None,
        }
    }

    /// A private scheme; restricted by default.
    #[must_use]
    pub fn private(name: impl Into<String>) -> Self {
        Self {
            scope: MatchScope::Private,
            authority_in_canonical: true,
            default_sensitivity: Sensitivity::Restricted,
            ..Self::global(name)
        }
    }

    #[must_use]
    pub const fn with_authority(mut self) -> Self {
        self.authority_in_canonical = true;
        self
    }

    #[must_use]
    pub const fn with_sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.default_sensitivity = sensitivity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: Option<Regex>) -> Self {
        self.format = format;
        self
    }
}

/// Non-fatal observation about a single identifier record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeFinding {
    Unrecognized,
    Malformed,
}

/// Table of known identifier schemes.
///
/// # Examples
///
/// ```
/// use netmerge::{Identifier, SchemeRegistry};
///
/// let registry = SchemeRegistry::standard();
/// assert!(registry.is_private("internal"));
/// assert!(!registry.is_private("lei"));
/// assert!(registry.check(&Identifier::new("lei", "5493001KJTIIGC8Y1R12")).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemeRegistry {
    schemes: BTreeMap<String, SchemeSpec>,
}

/// Scheme used for boundary-reference tokens.
pub const OPAQUE_SCHEME: &str = "opaque";

impl SchemeRegistry {
    /// An empty registry: every scheme is unrecognized and treated as global.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard supply-chain schemes.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(SchemeSpec::global("lei").with_format(pattern(r"^[A-Z0-9]{18}[0-9]{2}$")));
        registry.register(SchemeSpec::global("duns").with_format(pattern(r"^[0-9]{9}$")));
        registry.register(SchemeSpec::global("gln").with_format(pattern(r"^[0-9]{13}$")));
        registry.register(
            SchemeSpec::global("nat-reg")
                .with_authority()
                .with_sensitivity(Sensitivity::Restricted),
        );
        registry.register(
            SchemeSpec::global("vat")
                .with_authority()
                .with_sensitivity(Sensitivity::Restricted),
        );
        registry.register(SchemeSpec::private("internal"));
        registry.register(SchemeSpec::global(OPAQUE_SCHEME).with_format(pattern(r"^[0-9a-f]{64}$")));
        registry
    }

    /// Adds or replaces a scheme.
    pub fn register(&mut self, spec: SchemeSpec) {
        self.schemes.insert(spec.name.trim().to_ascii_lowercase(), spec);
    }

    #[must_use]
    pub fn with_scheme(mut self, spec: SchemeSpec) -> Self {
        self.register(spec);
        self
    }

    /// Looks up a scheme case-insensitively.
    #[must_use]
    pub fn get(&self, scheme: &str) -> Option<&SchemeSpec> {
        self.schemes.get(&scheme.trim().to_ascii_lowercase())
    }

    /// True when identifiers of `scheme` must never link across files.
    #[must_use]
    pub fn is_private(&self, scheme: &str) -> bool {
        self.get(scheme).is_some_and(|s| s.scope == MatchScope::Private)
    }

    /// Whether the canonical form carries the authority. Unknown schemes
    /// carry it whenever it is present.
    #[must_use]
    pub fn authority_in_canonical(&self, identifier: &Identifier) -> bool {
        match self.get(&identifier.scheme) {
            Some(spec) => spec.authority_in_canonical,
            None => identifier.authority.is_some(),
        }
    }

    /// Effective sensitivity of an identifier: explicit marker, else
    /// confidential on person nodes, else the scheme default (public for
    /// unknown schemes).
    #[must_use]
    pub fn effective_sensitivity(&self, identifier: &Identifier, node_type: &NodeType) -> Sensitivity {
        if let Some(explicit) = identifier.sensitivity {
            return explicit;
        }
        if *node_type == NodeType::Person {
            return Sensitivity::Confidential;
        }
        self.get(&identifier.scheme)
            .map_or(Sensitivity::Public, |s| s.default_sensitivity)
    }

    /// Checks an identifier against the table.
    #[must_use]
    pub fn check(&self, identifier: &Identifier) -> Option<SchemeFinding> {
        match self.get(&identifier.scheme) {
            None => Some(SchemeFinding::Unrecognized),
            Some(spec) => match &spec.format {
                Some(format) if !format.is_match(identifier.value.trim()) => Some(SchemeFinding::Malformed),
                _ => None,
            },
        }
    }
}

fn pattern(source: &str) -> Option<Regex> {
    Regex::new(source).ok()
}
