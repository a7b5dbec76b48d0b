//! File-local element identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a string id.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True for the empty string (rejected by structural validation).
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Node id, unique within one graph.
    ///
    /// Merged graphs use `n-<k>` ids assigned in canonical order.
    NodeId
);

string_id!(
    /// Edge id, unique within one graph.
    ///
    /// Merged graphs use `e-<k>` ids assigned in canonical order.
    EdgeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_transparent() {
        let id = NodeId::new("org-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"org-1\"");
        assert_eq!(id.to_string(), "org-1");
        assert!(!id.is_empty());
        assert!(EdgeId::new("  ").is_empty());
    }
}
