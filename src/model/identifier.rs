//! Identifier records and labels.

use serde::{Deserialize, Serialize};

use super::types::{Sensitivity, VerificationStatus};
use crate::time::ValidityWindow;

const ANNULLED: &str = "ANNULLED";

/// One external identifier of a node, e.g. an LEI or a VAT number.
///
/// # Examples
///
/// ```
/// use netmerge::Identifier;
///
/// let vat = Identifier::new("vat", "DE123456789").with_authority("DE");
/// assert_eq!(vat.authority.as_deref(), Some("DE"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identifier {
    /// Identifier scheme, e.g. `lei`, `duns`, `nat-reg`.
    pub scheme: String,

    /// Issuing authority, when the scheme needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,

    /// Identifier value.
    pub value: String,

    /// Explicit sensitivity; falls back to the scheme default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Sensitivity>,

    /// Period during which the identifier was assigned to this entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<ValidityWindow>,

    /// How the identifier was established.
    #[serde(default)]
    pub verification: VerificationStatus,

    /// Registration status reported by the issuer, e.g. `ISSUED` or
    /// `ANNULLED` for an LEI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_status: Option<String>,
}

impl Identifier {
    /// Creates an unverified identifier with no authority or validity.
    #[must_use]
    pub fn new(scheme: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            authority: None,
            value: value.into(),
            sensitivity: None,
            validity: None,
            verification: VerificationStatus::default(),
            entity_status: None,
        }
    }

    #[must_use]
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    #[must_use]
    pub const fn with_sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.sensitivity = Some(sensitivity);
        self
    }

    #[must_use]
    pub const fn with_validity(mut self, validity: ValidityWindow) -> Self {
        self.validity = Some(validity);
        self
    }

    #[must_use]
    pub const fn with_verification(mut self, verification: VerificationStatus) -> Self {
        self.verification = verification;
        self
    }

    #[must_use]
    pub fn with_entity_status(mut self, status: impl Into<String>) -> Self {
        self.entity_status = Some(status.into());
        self
    }

    /// An LEI whose registration was annulled. It names no entity and
    /// never links two nodes.
    #[must_use]
    pub fn is_annulled(&self) -> bool {
        self.scheme_key() == "lei" && self.entity_status.as_deref() == Some(ANNULLED)
    }

    /// Lowercased, trimmed scheme name.
    #[must_use]
    pub fn scheme_key(&self) -> String {
        self.scheme.trim().to_ascii_lowercase()
    }

    /// True when the record carries at least one validity bound.
    #[must_use]
    pub fn has_temporal_bounds(&self) -> bool {
        self.validity.is_some_and(|w| w.is_bounded())
    }
}

/// A free-form classification tag. Labels with equal key and value are
/// duplicates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Label {
    #[must_use]
    pub fn new(key: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            key: key.into(),
            value: value.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_identifier_defaults() {
        let id = Identifier::new(" LEI ", "5493001KJTIIGC8Y1R12");
        assert_eq!(id.scheme_key(), "lei");
        assert_eq!(id.verification, VerificationStatus::Unverified);
        assert!(!id.has_temporal_bounds());
    }

    #[test]
    fn test_temporal_bounds() {
        let from = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let bounded = Identifier::new("duns", "123456789").with_validity(ValidityWindow::starting(from));
        assert!(bounded.has_temporal_bounds());
        let open = Identifier::new("duns", "123456789").with_validity(ValidityWindow::unbounded());
        assert!(!open.has_temporal_bounds());
    }

    #[test]
    fn test_identifier_serde_defaults() {
        let id: Identifier = serde_json::from_str(r#"{"scheme":"gln","value":"4012345000009"}"#).unwrap();
        assert_eq!(id, Identifier::new("gln", "4012345000009"));
    }

    #[test]
    fn test_annulled_lei() {
        let lei = Identifier::new("LEI", "5493001KJTIIGC8Y1R12");
        assert!(!lei.is_annulled());
        assert!(lei.clone().with_entity_status("ANNULLED").is_annulled());
        assert!(!lei.with_entity_status("annulled").is_annulled());
        assert!(!Identifier::new("duns", "123456789").with_entity_status("ANNULLED").is_annulled());

        let parsed: Identifier =
            serde_json::from_str(r#"{"scheme":"lei","value":"5493001KJTIIGC8Y1R12","entity_status":"ANNULLED"}"#)
                .unwrap();
        assert!(parsed.is_annulled());
    }

    #[test]
    fn test_label_order() {
        let mut labels = vec![Label::new("tier", Some("2")), Label::new("risk", None), Label::new("tier", Some("1"))];
        labels.sort();
        assert_eq!(labels[0].key, "risk");
        assert_eq!(labels[1].value.as_deref(), Some("1"));
    }
}
