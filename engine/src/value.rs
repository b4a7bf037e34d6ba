//! Field values.
//!
//! Attributes fetched from the dataset are loosely typed JSON. They are
//! decoded once, at the boundary, into the [`Value`] union so the rest of
//! the engine can match on them exhaustively.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Multi-valued attribute
    List(Vec<Value>),
}

impl Value {
    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integral view of a numeric value.
    pub fn as_i64(&self) -> Option<i64> {
        match self.normalized() {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Borrow the elements, if this is a sequence.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Copy of the value with integral floats turned into integers.
    ///
    /// JSON does not distinguish `42` from `42.0`, so neither do we.
    pub fn normalized(&self) -> Value {
        match self {
            Value::Float(f) if is_integral(*f) => Value::Int(*f as i64),
            Value::List(items) => Value::List(items.iter().map(Value::normalized).collect()),
            other => other.clone(),
        }
    }

    /// Canonical JSON text of the value.
    ///
    /// Two values are the same attribute value iff their canonical forms are
    /// byte-identical. Sequences keep their order.
    pub fn canonical(&self) -> String {
        serde_json::Value::from(&self.normalized()).to_string()
    }

    /// Whether every number in the value can be written as JSON.
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Float(f) => f.is_finite(),
            Value::List(items) => items.iter().all(Value::is_finite),
            _ => true,
        }
    }

    /// Deep value equality via the canonical form.
    pub fn same_as(&self, other: &Value) -> bool {
        self.canonical() == other.canonical()
    }
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => f.write_str(&other.canonical()),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<MultiValue> for Value {
    fn from(multi: MultiValue) -> Self {
        Value::List(multi.0.into_iter().map(Value::String).collect())
    }
}

/// A multi-valued string attribute with set-style editing.
///
/// Edits are local. Store the result back with [`crate::Record::set`]:
///
/// ```rust
/// use dataset_engine::MultiValue;
///
/// let mut tags = MultiValue::from(vec!["web", "prod"]);
/// tags.add(["api", "web"]);
/// tags.delete("prod");
/// assert_eq!(tags.as_slice(), ["web", "api"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiValue(Vec<String>);

impl MultiValue {
    /// Create an empty multi value.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append elements that are not already present.
    pub fn add<I, S>(&mut self, elems: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for elem in elems {
            let elem = elem.into();
            if !self.contains(&elem) {
                self.0.push(elem);
            }
        }
    }

    /// Remove every occurrence of `elem`.
    pub fn delete(&mut self, elem: &str) {
        self.0.retain(|v| v != elem);
    }

    /// Remove all elements.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn contains(&self, elem: &str) -> bool {
        self.0.iter().any(|v| v == elem)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl<S: Into<String>> From<Vec<S>> for MultiValue {
    fn from(items: Vec<S>) -> Self {
        Self(items.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> FromIterator<S> for MultiValue {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl IntoIterator for MultiValue {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
