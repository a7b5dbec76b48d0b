//! Property values carried by nodes and edges.
//!
//! Values are compared in canonical JSON space: integral floats equal the
//! corresponding integers and object keys are ordered, so equality is
//! type-aware rather than literal.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};

/// A typed property value.
///
/// # Examples
///
/// ```
/// use netmerge::Value;
///
/// assert!(Value::Int(100).same_as(&Value::Float(100.0)));
/// assert!(!Value::Int(100).same_as(&Value::String("100".into())));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Structured(Json),
}

impl Value {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_structured(&self) -> Option<&Json> {
        match self {
            Self::Structured(v) => Some(v),
            _ => None,
        }
    }

    /// Canonical JSON form of this value.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Bool(v) => Json::Bool(*v),
            Self::Int(v) => Json::Number(Number::from(*v)),
            Self::Float(v) => float_to_json(*v),
            Self::String(v) => Json::String(v.clone()),
            Self::Structured(v) => canonical_json(v),
        }
    }

    /// Rebuilds a typed value from JSON, normalizing numbers first.
    #[must_use]
    pub fn from_json(json: &Json) -> Self {
        match canonical_json(json) {
            Json::Bool(v) => Self::Bool(v),
            Json::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Structured(Json::Number(n))),
            Json::String(v) => Self::String(v),
            other => Self::Structured(other),
        }
    }

    /// Type-aware equality: numeric values compare by magnitude.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.to_json() == other.to_json()
    }
}

/// Normalizes a JSON value: integral floats become integers and nested
/// containers are normalized element by element.
///
/// Walks with an explicit stack and rebuilds containers bottom-up, so deep
/// documents cannot exhaust the call stack here.
#[must_use]
pub fn canonical_json(value: &Json) -> Json {
    enum Step<'a> {
        Visit(&'a Json),
        Array(usize),
        Object(Vec<&'a String>),
    }

    let mut work = vec![Step::Visit(value)];
    let mut built: Vec<Json> = Vec::new();
    while let Some(step) = work.pop() {
        match step {
            Step::Visit(Json::Array(items)) => {
                work.push(Step::Array(items.len()));
                work.extend(items.iter().rev().map(Step::Visit));
            }
            Step::Visit(Json::Object(map)) => {
                work.push(Step::Object(map.keys().collect()));
                work.extend(map.values().rev().map(Step::Visit));
            }
            Step::Visit(Json::Number(n)) => built.push(match n.as_f64() {
                Some(f) if !n.is_i64() && !n.is_u64() => float_to_json(f),
                _ => Json::Number(n.clone()),
            }),
            Step::Visit(other) => built.push(other.clone()),
            Step::Array(len) => {
                let items = built.split_off(built.len().saturating_sub(len));
                built.push(Json::Array(items));
            }
            Step::Object(keys) => {
                let values = built.split_off(built.len().saturating_sub(keys.len()));
                let normalized: Map<String, Json> = keys.into_iter().cloned().zip(values).collect();
                built.push(Json::Object(normalized));
            }
        }
    }
    built.pop().unwrap_or(Json::Null)
}

/// Stable sort key for a canonical JSON value.
#[must_use]
pub fn json_key(value: &Json) -> String {
    value.to_string()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_json(v: f64) -> Json {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    if v.is_finite() && v.fract() == 0.0 && v >= -LIMIT && v < LIMIT {
        return Json::Number(Number::from(v as i64));
    }
    Number::from_f64(v).map_or(Json::Null, Json::Number)
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Structured(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Json> for Value {
    fn from(v: Json) -> Self {
        Self::Structured(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integral_float_equals_int() {
        assert!(Value::Float(200.0).same_as(&Value::Int(200)));
        assert!(!Value::Float(200.5).same_as(&Value::Int(200)));
        assert_eq!(Value::Float(-0.0).to_json(), json!(0));
    }

    #[test]
    fn test_string_is_not_number() {
        assert!(!Value::String("1".into()).same_as(&Value::Int(1)));
    }

    #[test]
    fn test_structured_canonicalizes_nested_numbers() {
        let a = Value::Structured(json!({"b": [1.0, {"c": 2.0}], "a": true}));
        let b = Value::Structured(json!({"a": true, "b": [1, {"c": 2}]}));
        assert!(a.same_as(&b));
        assert_eq!(json_key(&a.to_json()), r#"{"a":true,"b":[1,{"c":2}]}"#);
    }

    #[test]
    fn test_canonical_json_keeps_order_and_shape() {
        let value = json!({"z": [3.0, "x", [1.5, {"k": 2.0}]], "a": {}, "m": null});
        assert_eq!(
            canonical_json(&value),
            json!({"a": {}, "m": null, "z": [3, "x", [1.5, {"k": 2}]]})
        );
        assert_eq!(canonical_json(&json!([])), json!([]));
        assert_eq!(canonical_json(&json!(7.0)), json!(7));
    }

    #[test]
    fn test_canonical_json_handles_deep_nesting() {
        let mut deep = json!(1.0);
        for _ in 0..2_000 {
            deep = json!([deep]);
        }
        let normalized = canonical_json(&deep);
        let mut cursor = &normalized;
        let mut depth = 0;
        while let Json::Array(items) = cursor {
            cursor = &items[0];
            depth += 1;
        }
        assert_eq!(depth, 2_000);
        assert_eq!(cursor, &json!(1));
    }

    #[test]
    fn test_from_json_restores_types() {
        assert_eq!(Value::from_json(&json!(3.0)), Value::Int(3));
        assert_eq!(Value::from_json(&json!(3.5)), Value::Float(3.5));
        assert_eq!(Value::from_json(&json!("x")), Value::String("x".into()));
        assert_eq!(Value::from_json(&json!(null)), Value::Structured(Json::Null));
        assert!(matches!(Value::from_json(&json!({"k": 1})), Value::Structured(_)));
    }

    #[test]
    fn test_untagged_serde() {
        let parsed: Value = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, Value::Int(42));
        let parsed: Value = serde_json::from_str("4.5").unwrap();
        assert_eq!(parsed, Value::Float(4.5));
        let parsed: Value = serde_json::from_str(r#"{"k":"v"}"#).unwrap();
        assert!(matches!(parsed, Value::Structured(_)));
        assert_eq!(serde_json::to_string(&Value::Bool(true)).unwrap(), "true");
    }

    #[test]
    fn test_nan_is_null() {
        assert_eq!(Value::Float(f64::NAN).to_json(), Json::Null);
    }
}
