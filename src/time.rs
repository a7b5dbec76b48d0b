//! Temporal validity of identifiers and edges.
//!
//! Validity is expressed over calendar dates with inclusive bounds. A missing
//! bound means the window is unbounded on that side.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A closed date interval `[from, to]`, either side optional.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use netmerge::ValidityWindow;
///
/// let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
/// let a = ValidityWindow::between(d(2020, 1, 1), d(2020, 12, 31));
/// let b = ValidityWindow::starting(d(2020, 12, 31));
/// assert!(a.overlaps(&b));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// First day of validity (inclusive). None means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,

    /// Last day of validity (inclusive). None means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

impl ValidityWindow {
    /// A window bounded on both sides.
    #[must_use]
    pub const fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// A window starting at `from` with no end.
    #[must_use]
    pub const fn starting(from: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    /// A window ending at `to` with no start.
    #[must_use]
    pub const fn until(to: NaiveDate) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }

    /// Unbounded on both sides.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { from: None, to: None }
    }

    /// True when at least one bound is present.
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    /// True when `from <= to` or either side is open.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match (self.from, self.to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        }
    }

    /// The `(from, to)` pair when `from` is after `to`.
    #[must_use]
    pub fn inverted_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Some((from, to)),
            _ => None,
        }
    }

    /// Check if a date falls within this window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| from <= date) && self.to.map_or(true, |to| date <= to)
    }

    /// Inclusive overlap test; a shared boundary day counts as overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let self_before_other = match (self.to, other.from) {
            (Some(end), Some(start)) => end < start,
            _ => false,
        };
        let other_before_self = match (other.to, self.from) {
            (Some(end), Some(start)) => end < start,
            _ => false,
        };
        !self_before_other && !other_before_self
    }

    /// Returns the intersection of two windows, if any.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }

        let from = match (self.from, other.from) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let to = match (self.to, other.to) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        Some(Self { from, to })
    }
}

impl std::fmt::Display for ValidityWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.from, self.to) {
            (Some(from), Some(to)) => write!(f, "[{from}, {to}]"),
            (Some(from), None) => write!(f, "[{from}, ∞)"),
            (None, Some(to)) => write!(f, "(∞, {to}]"),
            (None, None) => write!(f, "(∞, ∞)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_overlap_inclusive_boundary() {
        let a = ValidityWindow::between(d(2020, 1, 1), d(2020, 6, 30));
        let b = ValidityWindow::between(d(2020, 6, 30), d(2020, 12, 31));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_disjoint_windows() {
        let a = ValidityWindow::between(d(2010, 1, 1), d(2012, 1, 1));
        let b = ValidityWindow::starting(d(2015, 1, 1));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_unbounded_overlaps_everything() {
        let open = ValidityWindow::unbounded();
        let a = ValidityWindow::until(d(1999, 1, 1));
        assert!(open.overlaps(&a));
        assert!(!open.is_bounded());
        assert!(a.is_bounded());
    }

    #[test]
    fn test_intersection() {
        let a = ValidityWindow::starting(d(2020, 1, 1));
        let b = ValidityWindow::until(d(2021, 1, 1));
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, ValidityWindow::between(d(2020, 1, 1), d(2021, 1, 1)));
        assert!(i.contains(d(2020, 7, 1)));
        assert!(!i.contains(d(2021, 1, 2)));
    }

    #[test]
    fn test_well_formed() {
        assert!(ValidityWindow::between(d(2020, 1, 1), d(2020, 1, 1)).is_well_formed());
        assert!(!ValidityWindow::between(d(2021, 1, 1), d(2020, 1, 1)).is_well_formed());
    }

    #[test]
    fn test_serde_omits_open_bounds() {
        let w = ValidityWindow::starting(d(2020, 3, 1));
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"from":"2020-03-01"}"#);
        let back: ValidityWindow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, w);
    }
}
