//! # Generic Document Tree
//!
//! Compliance-profile documents are arbitrarily nested mappings, sequences,
//! and scalars parsed from YAML or JSON. Rather than threading a dynamically
//! typed value through the engine, the tree is a tagged variant with explicit
//! down-casting helpers that return a typed error on mismatch instead of
//! silently failing.
//!
//! ## Design Decisions
//!
//! - Mappings are insertion-ordered (`IndexMap`). Discovery order is
//!   semantically meaningful: deep-merge resolution, conflict diagnostics,
//!   and Hiera parameter iteration must all be deterministic for a fixed
//!   input order.
//! - YAML is parsed in safe mode: tagged values are rejected rather than
//!   interpreted.
//! - `Float` exists alongside `Integer` because real corpora contain
//!   fractional risk levels and thresholds; the two are distinct types for
//!   conflict detection.

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

/// Marker prefix that deletes a previously merged sequence element.
///
/// During a deep merge, an incoming string element `--x` removes any
/// already-merged element equal to `x` and is not itself inserted.
pub const KNOCKOUT_PREFIX: &str = "--";

/// A parsed document tree: mappings, sequences, and scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Insertion-ordered mapping of string keys to values.
    Mapping(IndexMap<String, Value>),
    /// Ordered sequence of values.
    Sequence(Vec<Value>),
    /// UTF-8 string scalar.
    String(String),
    /// Signed 64-bit integer scalar.
    Integer(i64),
    /// 64-bit float scalar.
    Float(f64),
    /// Boolean scalar.
    Boolean(bool),
    /// Explicit null.
    Null,
}

/// Errors raised by down-casting helpers and document-tree conversion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A down-cast found a different variant than expected.
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        /// The variant the caller required.
        expected: &'static str,
        /// The variant actually present.
        actual: &'static str,
    },

    /// The YAML document used a construct outside the safe subset.
    #[error("unsupported YAML construct: {0}")]
    UnsupportedYaml(String),

    /// A mapping key could not be represented as a string.
    #[error("unsupported mapping key: {0}")]
    UnsupportedKey(String),
}

impl Value {
    /// An empty mapping.
    pub fn mapping() -> Value {
        Value::Mapping(IndexMap::new())
    }

    /// Stable type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Mapping(_) => "mapping",
            Value::Sequence(_) => "sequence",
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
        }
    }

    /// Everything except `false` and `null` is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null)
    }

    /// Whether this value is the literal `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Down-cast to a mapping.
    pub fn as_mapping(&self) -> Result<&IndexMap<String, Value>, ValueError> {
        match self {
            Value::Mapping(map) => Ok(map),
            other => Err(ValueError::TypeMismatch {
                expected: "mapping",
                actual: other.type_name(),
            }),
        }
    }

    /// Down-cast to a mutable mapping.
    pub fn as_mapping_mut(&mut self) -> Result<&mut IndexMap<String, Value>, ValueError> {
        match self {
            Value::Mapping(map) => Ok(map),
            other => Err(ValueError::TypeMismatch {
                expected: "mapping",
                actual: other.type_name(),
            }),
        }
    }

    /// Down-cast to a sequence.
    pub fn as_sequence(&self) -> Result<&[Value], ValueError> {
        match self {
            Value::Sequence(seq) => Ok(seq),
            other => Err(ValueError::TypeMismatch {
                expected: "sequence",
                actual: other.type_name(),
            }),
        }
    }

    /// Down-cast to a string slice.
    pub fn as_str(&self) -> Result<&str, ValueError> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(ValueError::TypeMismatch {
                expected: "string",
                actual: other.type_name(),
            }),
        }
    }

    /// Down-cast to an integer.
    pub fn as_integer(&self) -> Result<i64, ValueError> {
        match self {
            Value::Integer(n) => Ok(*n),
            other => Err(ValueError::TypeMismatch {
                expected: "integer",
                actual: other.type_name(),
            }),
        }
    }

    /// Down-cast to a boolean.
    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(ValueError::TypeMismatch {
                expected: "boolean",
                actual: other.type_name(),
            }),
        }
    }

    /// Mapping lookup; `None` for absent keys and non-mapping receivers.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// Recursively merge `other` into `self`.
    ///
    /// Mappings merge key-by-key, sequences merge with knockout and
    /// deduplication (see [`KNOCKOUT_PREFIX`]), and any other combination
    /// overwrites `self` with `other`. The merge itself is silent; conflict
    /// diagnostics are the caller's concern.
    pub fn deep_merge(&mut self, other: &Value) {
        match (&mut *self, other) {
            (Value::Mapping(dst), Value::Mapping(src)) => {
                for (key, value) in src {
                    match dst.get_mut(key) {
                        Some(existing) => existing.deep_merge(value),
                        None => {
                            dst.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            (Value::Sequence(dst), Value::Sequence(src)) => merge_sequences(dst, src),
            (dst, src) => *dst = src.clone(),
        }
    }

    /// Convert a safe-mode YAML value into a document tree.
    ///
    /// # Errors
    ///
    /// Rejects YAML tags and mapping keys that are not strings, numbers,
    /// or booleans.
    pub fn from_yaml(yaml: &serde_yaml::Value) -> Result<Value, ValueError> {
        match yaml {
            serde_yaml::Value::Null => Ok(Value::Null),
            serde_yaml::Value::Bool(b) => Ok(Value::Boolean(*b)),
            serde_yaml::Value::Number(n) => Ok(number_from_parts(n.as_i64(), n.as_f64())),
            serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
            serde_yaml::Value::Sequence(seq) => {
                let items: Result<Vec<Value>, ValueError> =
                    seq.iter().map(Value::from_yaml).collect();
                Ok(Value::Sequence(items?))
            }
            serde_yaml::Value::Mapping(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    let key = match k {
                        serde_yaml::Value::String(s) => s.clone(),
                        serde_yaml::Value::Number(n) => n.to_string(),
                        serde_yaml::Value::Bool(b) => b.to_string(),
                        other => {
                            return Err(ValueError::UnsupportedKey(format!("{other:?}")));
                        }
                    };
                    out.insert(key, Value::from_yaml(v)?);
                }
                Ok(Value::Mapping(out))
            }
            serde_yaml::Value::Tagged(tagged) => {
                Err(ValueError::UnsupportedYaml(format!("tag {}", tagged.tag)))
            }
        }
    }

    /// Convert a JSON value into a document tree. Infallible: every JSON
    /// construct has a direct counterpart.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => number_from_parts(n.as_i64(), n.as_f64()),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(seq) => {
                Value::Sequence(seq.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), Value::from_json(v));
                }
                Value::Mapping(out)
            }
        }
    }
}

fn number_from_parts(int: Option<i64>, float: Option<f64>) -> Value {
    match (int, float) {
        (Some(n), _) => Value::Integer(n),
        (None, Some(f)) => Value::Float(f),
        // Unreachable for serde_yaml/serde_json numbers, but total anyway.
        (None, None) => Value::Null,
    }
}

/// Sequence merge: knockout, then dedup-append.
fn merge_sequences(dst: &mut Vec<Value>, src: &[Value]) {
    for item in src {
        if let Value::String(s) = item {
            if let Some(target) = s.strip_prefix(KNOCKOUT_PREFIX) {
                let target = Value::String(target.to_string());
                dst.retain(|existing| *existing != target);
                continue;
            }
        }
        if !dst.contains(item) {
            dst.push(item.clone());
        }
    }
}

impl fmt::Display for Value {
    /// Compact JSON-like rendering used in diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Sequence(seq) => {
                write!(f, "[")?;
                for (i, v) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::String(s) => write!(f, "{s:?}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        let parsed: serde_yaml::Value = serde_yaml::from_str(src).unwrap();
        Value::from_yaml(&parsed).unwrap()
    }

    #[test]
    fn type_names_are_stable() {
        assert_eq!(Value::mapping().type_name(), "mapping");
        assert_eq!(Value::Sequence(vec![]).type_name(), "sequence");
        assert_eq!(Value::from("x").type_name(), "string");
        assert_eq!(Value::from(1i64).type_name(), "integer");
        assert_eq!(Value::Float(1.5).type_name(), "float");
        assert_eq!(Value::from(true).type_name(), "boolean");
        assert_eq!(Value::Null.type_name(), "null");
    }

    #[test]
    fn truthiness_matches_merge_semantics() {
        assert!(Value::from(true).is_truthy());
        assert!(Value::from("enabled").is_truthy());
        assert!(Value::from(0i64).is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(!Value::Null.is_truthy());
    }

    #[test]
    fn downcast_mismatch_names_both_types() {
        let err = Value::from(3i64).as_str().unwrap_err();
        assert_eq!(
            err,
            ValueError::TypeMismatch {
                expected: "string",
                actual: "integer",
            }
        );
        assert!(err.to_string().contains("expected string"));
    }

    #[test]
    fn downcast_success() {
        assert_eq!(yaml("a: 1").as_mapping().unwrap().len(), 1);
        assert_eq!(yaml("[1, 2]").as_sequence().unwrap().len(), 2);
        assert_eq!(Value::from("x").as_str().unwrap(), "x");
        assert_eq!(Value::from(7i64).as_integer().unwrap(), 7);
        assert!(Value::from(true).as_bool().unwrap());
    }

    #[test]
    fn from_yaml_parses_scalars() {
        assert_eq!(yaml("42"), Value::Integer(42));
        assert_eq!(yaml("1.5"), Value::Float(1.5));
        assert_eq!(yaml("true"), Value::Boolean(true));
        assert_eq!(yaml("~"), Value::Null);
        assert_eq!(yaml("hello"), Value::String("hello".to_string()));
    }

    #[test]
    fn from_yaml_stringifies_scalar_keys() {
        let doc = yaml("1: one\ntrue: yes");
        let map = doc.as_mapping().unwrap();
        assert!(map.contains_key("1"));
        assert!(map.contains_key("true"));
    }

    #[test]
    fn from_yaml_rejects_tags() {
        let parsed: serde_yaml::Value = serde_yaml::from_str("!custom 1").unwrap();
        let err = Value::from_yaml(&parsed).unwrap_err();
        assert!(matches!(err, ValueError::UnsupportedYaml(_)));
    }

    #[test]
    fn from_json_roundtrips_structure() {
        let parsed: serde_json::Value =
            serde_json::from_str(r#"{"a": [1, 2.5, null], "b": {"c": true}}"#).unwrap();
        let value = Value::from_json(&parsed);
        let a = value.get("a").unwrap().as_sequence().unwrap();
        assert_eq!(a[0], Value::Integer(1));
        assert_eq!(a[1], Value::Float(2.5));
        assert_eq!(a[2], Value::Null);
        assert_eq!(value.get("b").unwrap().get("c"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn deep_merge_combines_nested_mappings() {
        let mut base = yaml("a:\n  x: 1\nb: keep");
        base.deep_merge(&yaml("a:\n  y: 2\nc: add"));
        assert_eq!(base.get("a").unwrap().get("x"), Some(&Value::Integer(1)));
        assert_eq!(base.get("a").unwrap().get("y"), Some(&Value::Integer(2)));
        assert_eq!(base.get("b").unwrap().as_str().unwrap(), "keep");
        assert_eq!(base.get("c").unwrap().as_str().unwrap(), "add");
    }

    #[test]
    fn deep_merge_later_scalar_wins_silently() {
        let mut base = yaml("a: old");
        base.deep_merge(&yaml("a: new"));
        assert_eq!(base.get("a").unwrap().as_str().unwrap(), "new");
    }

    #[test]
    fn deep_merge_sequences_concat_and_dedup() {
        let mut base = yaml("list: [a, b]");
        base.deep_merge(&yaml("list: [b, c]"));
        let list = base.get("list").unwrap().as_sequence().unwrap();
        assert_eq!(list, &[Value::from("a"), Value::from("b"), Value::from("c")]);
    }

    #[test]
    fn deep_merge_knockout_removes_element() {
        let mut base = yaml("list: [a, b, c]");
        base.deep_merge(&yaml("list: ['--b', d]"));
        let list = base.get("list").unwrap().as_sequence().unwrap();
        assert_eq!(list, &[Value::from("a"), Value::from("c"), Value::from("d")]);
    }

    #[test]
    fn deep_merge_mapping_overwrites_scalar() {
        let mut base = yaml("a: scalar");
        base.deep_merge(&yaml("a:\n  nested: true"));
        assert_eq!(base.get("a").unwrap().get("nested"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn display_is_json_like() {
        let doc = yaml("a: [1, two]\nb: null");
        assert_eq!(doc.to_string(), r#"{"a": [1, "two"], "b": null}"#);
    }
}
