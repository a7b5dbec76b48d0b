//! Canonical identity strings and content fingerprints.
//!
//! The canonical identity string is the merge key for identifiers and the
//! hash input for boundary references, so its encoding is byte-exact:
//! `{scheme}:{value}` or `{scheme}:{authority}:{value}`, with `%`, `:`,
//! `\n` and `\r` percent-encoded in every component.

use serde::Serialize;

use crate::error::MergeResult;
use crate::model::{Graph, Identifier};
use crate::scheme::SchemeRegistry;

/// Percent-encodes the four reserved characters.
#[must_use]
pub fn percent_encode(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for ch in component.chars() {
        match ch {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            '\n' => out.push_str("%0A"),
            '\r' => out.push_str("%0D"),
            c => out.push(c),
        }
    }
    out
}

/// Canonical identity string of an identifier record.
///
/// Scheme and authority are lowercased so that matching is
/// case-insensitive for both; the value is trimmed but keeps its case.
///
/// # Examples
///
/// ```
/// use netmerge::{canonical::canonical_id, Identifier, SchemeRegistry};
///
/// let registry = SchemeRegistry::standard();
/// let lei = Identifier::new("LEI", " 5493001KJTIIGC8Y1R12 ");
/// assert_eq!(canonical_id(&lei, &registry), "lei:5493001KJTIIGC8Y1R12");
///
/// let reg = Identifier::new("nat-reg", "HRB 86891").with_authority("RA000548");
/// assert_eq!(canonical_id(&reg, &registry), "nat-reg:ra000548:HRB 86891");
/// ```
#[must_use]
pub fn canonical_id(identifier: &Identifier, registry: &SchemeRegistry) -> String {
    let scheme = percent_encode(&identifier.scheme_key());
    let value = percent_encode(identifier.value.trim());
    if registry.authority_in_canonical(identifier) {
        let authority = identifier
            .authority
            .as_deref()
            .map(|a| a.trim().to_ascii_lowercase())
            .unwrap_or_default();
        format!("{scheme}:{}:{value}", percent_encode(&authority))
    } else {
        format!("{scheme}:{value}")
    }
}

/// Deterministic serialization used to order elements.
///
/// # Errors
///
/// Returns `MergeError::Serialization` if serialization fails.
pub fn content_key<T: Serialize>(value: &T) -> MergeResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// BLAKE3 fingerprint of a graph's full serialized content, as hex.
///
/// Two inputs with equal fingerprints are the same input; the merge treats
/// its inputs as a set.
///
/// # Errors
///
/// Returns `MergeError::Serialization` if serialization fails.
pub fn fingerprint(graph: &Graph) -> MergeResult<String> {
    let bytes = serde_json::to_vec(graph)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, NodeType};

    #[test]
    fn test_reserved_characters_are_encoded() {
        assert_eq!(percent_encode("a:b%c\nd\re"), "a%3Ab%25c%0Ad%0De");
        let registry = SchemeRegistry::standard();
        let id = Identifier::new("x-code", "A:1").with_authority("Acme:EU");
        assert_eq!(canonical_id(&id, &registry), "x-code:acme%3Aeu:A%3A1");
    }

    #[test]
    fn test_authority_ignored_for_lei() {
        let registry = SchemeRegistry::standard();
        let id = Identifier::new("lei", "5493001KJTIIGC8Y1R12").with_authority("GLEIF");
        assert_eq!(canonical_id(&id, &registry), "lei:5493001KJTIIGC8Y1R12");
    }

    #[test]
    fn test_missing_required_authority_is_empty() {
        let registry = SchemeRegistry::standard();
        let id = Identifier::new("vat", "123");
        assert_eq!(canonical_id(&id, &registry), "vat::123");
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = Graph::new("a").with_node(Node::new("n1", NodeType::Good));
        let b = Graph::new("a").with_node(Node::new("n1", NodeType::Good));
        let c = Graph::new("a").with_node(Node::new("n2", NodeType::Good));
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&c).unwrap());
        assert_eq!(fingerprint(&a).unwrap().len(), 64);
    }
}
