//! Filter model.
//!
//! A [`Filters`] set maps attribute names to [`Condition`]s. A condition is
//! either a plain value (implicit equality) or a [`Filter`], a named
//! operation with one operand. Operands nest, so arbitrary logic is built by
//! composition:
//!
//! ```rust
//! use dataset_engine::filter::{any, not, regexp, Filters};
//!
//! let filters = Filters::new()
//!     .with("hostname", not(any([regexp("^db"), regexp("^cache")])))
//!     .with("state", "online");
//!
//! assert_eq!(
//!     serde_json::to_string(&filters).unwrap(),
//!     r#"{"hostname":{"Not":{"Any":[{"Regexp":"^db"},{"Regexp":"^cache"}]}},"state":"online"}"#
//! );
//! ```
//!
//! Nothing is validated here; the service rejects operands it cannot use.

use crate::Value;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Name of a filter operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Any,
    All,
    ContainedBy,
    ContainedOnlyBy,
    Contains,
    Empty,
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,
    Not,
    Overlaps,
    Regexp,
    StartsWith,
    /// An operation this client does not know, passed through verbatim
    Other(String),
}

/// Every operation with a known name.
pub const REGISTERED_OPS: [FilterOp; 14] = [
    FilterOp::Any,
    FilterOp::All,
    FilterOp::ContainedBy,
    FilterOp::ContainedOnlyBy,
    FilterOp::Contains,
    FilterOp::Empty,
    FilterOp::GreaterThan,
    FilterOp::GreaterThanOrEquals,
    FilterOp::LessThan,
    FilterOp::LessThanOrEquals,
    FilterOp::Not,
    FilterOp::Overlaps,
    FilterOp::Regexp,
    FilterOp::StartsWith,
];

impl FilterOp {
    /// Wire name of the operation.
    pub fn name(&self) -> &str {
        match self {
            FilterOp::Any => "Any",
            FilterOp::All => "All",
            FilterOp::ContainedBy => "ContainedBy",
            FilterOp::ContainedOnlyBy => "ContainedOnlyBy",
            FilterOp::Contains => "Contains",
            FilterOp::Empty => "Empty",
            FilterOp::GreaterThan => "GreaterThan",
            FilterOp::GreaterThanOrEquals => "GreaterThanOrEquals",
            FilterOp::LessThan => "LessThan",
            FilterOp::LessThanOrEquals => "LessThanOrEquals",
            FilterOp::Not => "Not",
            FilterOp::Overlaps => "Overlaps",
            FilterOp::Regexp => "Regexp",
            FilterOp::StartsWith => "StartsWith",
            FilterOp::Other(name) => name,
        }
    }

    /// Resolve a function name case-insensitively.
    ///
    /// Unknown names come back as [`FilterOp::Other`] with the original
    /// spelling.
    pub fn lookup(name: &str) -> FilterOp {
        REGISTERED_OPS
            .iter()
            .find(|op| op.name().eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| FilterOp::Other(name.to_string()))
    }

    /// Operations whose operand is always a list.
    pub fn is_variadic(&self) -> bool {
        matches!(self, FilterOp::Any | FilterOp::All)
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The argument of a filter operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Operand {
    /// No argument, as in `Empty`
    #[default]
    Null,
    Value(Value),
    Filter(Box<Filter>),
    List(Vec<Operand>),
}

impl Serialize for Operand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Operand::Null => serializer.serialize_unit(),
            Operand::Value(value) => value.serialize(serializer),
            Operand::Filter(filter) => filter.serialize(serializer),
            Operand::List(items) => items.serialize(serializer),
        }
    }
}

/// A single named operation and its operand.
///
/// Always serializes as a one-entry map: `{"Regexp": "^web"}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub op: FilterOp,
    pub operand: Operand,
}

impl Filter {
    /// Create a filter from an operation and operand.
    pub fn new(op: FilterOp, operand: impl Into<Operand>) -> Self {
        Self {
            op,
            operand: operand.into(),
        }
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.op.name(), &self.operand)?;
        map.end()
    }
}

/// What an attribute has to satisfy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Condition {
    /// Implicit equality
    Value(Value),
    Filter(Filter),
}

/// Attribute name to condition mapping. The last condition set for a name wins.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Filters(BTreeMap<String, Condition>);

impl Filters {
    /// Create an empty filter set.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder form of [`Filters::insert`].
    pub fn with(mut self, field: impl Into<String>, condition: impl Into<Condition>) -> Self {
        self.insert(field, condition);
        self
    }

    /// Set the condition for an attribute, replacing any previous one.
    pub fn insert(&mut self, field: impl Into<String>, condition: impl Into<Condition>) {
        self.0.insert(field.into(), condition.into());
    }

    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Condition)> {
        self.0.iter()
    }
}

macro_rules! impl_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Value(Value::from(v))
                }
            }

            impl From<$ty> for Condition {
                fn from(v: $ty) -> Self {
                    Condition::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_from_value!(&str, String, bool, i64, i32, u32, f64);

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<Filter> for Operand {
    fn from(f: Filter) -> Self {
        Operand::Filter(Box::new(f))
    }
}

impl From<Vec<Operand>> for Operand {
    fn from(items: Vec<Operand>) -> Self {
        Operand::List(items)
    }
}

impl From<Condition> for Operand {
    fn from(c: Condition) -> Self {
        match c {
            Condition::Value(v) => Operand::Value(v),
            Condition::Filter(f) => Operand::Filter(Box::new(f)),
        }
    }
}

impl From<Value> for Condition {
    fn from(v: Value) -> Self {
        Condition::Value(v)
    }
}

impl From<Filter> for Condition {
    fn from(f: Filter) -> Self {
        Condition::Filter(f)
    }
}

fn list<I, T>(values: I) -> Operand
where
    I: IntoIterator<Item = T>,
    T: Into<Operand>,
{
    Operand::List(values.into_iter().map(Into::into).collect())
}

/// Negate a value or filter. `not(2)` means "!= 2".
pub fn not(operand: impl Into<Operand>) -> Filter {
    Filter::new(FilterOp::Not, operand)
}

/// Shortcut for `not(empty())`.
pub fn not_empty() -> Filter {
    not(empty())
}

/// Attributes without a value.
pub fn empty() -> Filter {
    Filter::new(FilterOp::Empty, Operand::Null)
}

/// Any of the given values or filters (OR).
pub fn any<I, T>(values: I) -> Filter
where
    I: IntoIterator<Item = T>,
    T: Into<Operand>,
{
    Filter::new(FilterOp::Any, list(values))
}

/// All of the given values or filters (AND).
pub fn all<I, T>(values: I) -> Filter
where
    I: IntoIterator<Item = T>,
    T: Into<Operand>,
{
    Filter::new(FilterOp::All, list(values))
}

pub fn regexp(pattern: impl Into<String>) -> Filter {
    Filter::new(FilterOp::Regexp, Into::<String>::into(pattern))
}

pub fn starts_with(prefix: impl Into<String>) -> Filter {
    Filter::new(FilterOp::StartsWith, Into::<String>::into(prefix))
}

pub fn greater_than(value: impl Into<Value>) -> Filter {
    Filter::new(FilterOp::GreaterThan, Into::<Value>::into(value))
}

pub fn greater_than_or_equals(value: impl Into<Value>) -> Filter {
    Filter::new(FilterOp::GreaterThanOrEquals, Into::<Value>::into(value))
}

pub fn less_than(value: impl Into<Value>) -> Filter {
    Filter::new(FilterOp::LessThan, Into::<Value>::into(value))
}

pub fn less_than_or_equals(value: impl Into<Value>) -> Filter {
    Filter::new(FilterOp::LessThanOrEquals, Into::<Value>::into(value))
}

/// Multi-valued attributes containing the value.
pub fn contains(operand: impl Into<Operand>) -> Filter {
    Filter::new(FilterOp::Contains, operand)
}

/// Attributes whose values are a subset of the operand.
pub fn contained_by(operand: impl Into<Operand>) -> Filter {
    Filter::new(FilterOp::ContainedBy, operand)
}

pub fn contained_only_by(operand: impl Into<Operand>) -> Filter {
    Filter::new(FilterOp::ContainedOnlyBy, operand)
}

/// Multi-valued attributes sharing at least one element with the operand.
pub fn overlaps(operand: impl Into<Operand>) -> Filter {
    Filter::new(FilterOp::Overlaps, operand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
        serde_json::to_value(value).unwrap()
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(FilterOp::lookup("regexp"), FilterOp::Regexp);
        assert_eq!(FilterOp::lookup("GREATERTHANOREQUALS"), FilterOp::GreaterThanOrEquals);
        assert_eq!(FilterOp::lookup("startsWith"), FilterOp::StartsWith);
    }

    #[test]
    fn lookup_preserves_unknown_names() {
        let op = FilterOp::lookup("NearBy");
        assert_eq!(op, FilterOp::Other("NearBy".into()));
        assert_eq!(op.name(), "NearBy");
    }

    #[test]
    fn constructors_render_single_entry_maps() {
        assert_eq!(to_json(&not_empty()), json!({"Not": {"Empty": null}}));
        assert_eq!(to_json(&regexp(".*GB")), json!({"Regexp": ".*GB"}));
        assert_eq!(to_json(&starts_with("dc-x-")), json!({"StartsWith": "dc-x-"}));
        assert_eq!(to_json(&greater_than(4)), json!({"GreaterThan": 4}));
        assert_eq!(to_json(&less_than_or_equals(8)), json!({"LessThanOrEquals": 8}));
        assert_eq!(to_json(&not(2)), json!({"Not": 2}));
        assert_eq!(to_json(&contains("web")), json!({"Contains": "web"}));
        assert_eq!(to_json(&overlaps(any(["a", "b"]))), json!({"Overlaps": {"Any": ["a", "b"]}}));
    }

    #[test]
    fn variadic_constructors_always_take_lists() {
        assert_eq!(to_json(&any([1, 2, 3])), json!({"Any": [1, 2, 3]}));
        assert_eq!(to_json(&all(["backup"])), json!({"All": ["backup"]}));
        assert_eq!(to_json(&any(Vec::<Filter>::new())), json!({"Any": []}));
    }

    #[test]
    fn nested_composition() {
        let filter = any([regexp("test.foo.local"), regexp(".*\\.bar.local")]);
        assert_eq!(
            serde_json::to_string(&filter).unwrap(),
            r#"{"Any":[{"Regexp":"test.foo.local"},{"Regexp":".*\\.bar.local"}]}"#
        );
    }

    #[test]
    fn filter_set_last_write_wins() {
        let mut filters = Filters::new().with("state", "online");
        filters.insert("state", "maintenance");
        filters.insert("num_cpu", 8);

        assert_eq!(filters.len(), 2);
        assert_eq!(
            to_json(&filters),
            json!({"state": "maintenance", "num_cpu": 8})
        );
    }

    #[test]
    fn filter_set_mixes_values_and_filters() {
        let filters = Filters::new()
            .with("hostname", not_empty())
            .with("num_cpu", regexp(".*GB"))
            .with("hypervisor", starts_with("datacenter-x-"))
            .with("backup_disabled", false);

        assert_eq!(
            filters.get("hostname"),
            Some(&Condition::Filter(not(empty())))
        );
        assert_eq!(
            filters.get("backup_disabled"),
            Some(&Condition::Value(Value::Bool(false)))
        );
    }
}
