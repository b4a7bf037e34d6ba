//! Records and their pending-change tracking.
//!
//! A [`Record`] holds the attributes of one server object. Writes go through
//! [`Record::set`], which remembers the value each attribute had before its
//! first write since the last commit or rollback. That memory is the only
//! source of truth for what changed.

use crate::error::{Error, Result};
use crate::value::MultiValue;
use crate::{FieldName, ObjectId, Value, OBJECT_ID};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Where a record stands with respect to the remote dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    /// Not yet stored remotely (no identity)
    Created,
    /// Marked for deletion
    Deleted,
    /// Has attribute values that differ from what was fetched
    Changed,
    /// Nothing to send
    Consistent,
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitState::Created => write!(f, "created"),
            CommitState::Deleted => write!(f, "deleted"),
            CommitState::Changed => write!(f, "changed"),
            CommitState::Consistent => write!(f, "consistent"),
        }
    }
}

/// Change of one attribute, as sent in a commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum FieldChange {
    /// Whole-value replacement
    Update { old: Value, new: Value },
    /// Membership change of a multi-valued attribute
    Multi { add: Vec<Value>, remove: Vec<Value> },
}

/// The delta of one changed record.
///
/// Serializes flat: `{"object_id": 42, "hostname": {"action": "update", ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeSet {
    pub object_id: Option<ObjectId>,
    #[serde(flatten)]
    pub changes: BTreeMap<FieldName, FieldChange>,
}

impl ChangeSet {
    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.changes.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

static NULL: Value = Value::Null;

/// One server object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Current attribute values
    fields: BTreeMap<FieldName, Value>,
    /// Values before the first write since the last settle point
    prior: BTreeMap<FieldName, Value>,
    /// Marked for deletion on the next commit
    deleted: bool,
}

impl Record {
    /// Wrap attributes fetched from the dataset.
    pub fn from_fields(fields: BTreeMap<FieldName, Value>) -> Self {
        Self {
            fields,
            prior: BTreeMap::new(),
            deleted: false,
        }
    }

    /// Current value of an attribute, with integral numbers as integers.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.fields.get(field).map(Value::normalized)
    }

    /// String value of an attribute, or an empty string.
    pub fn get_string(&self, field: &str) -> String {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// String elements of a multi-valued attribute.
    ///
    /// Non-string elements are dropped. Missing and scalar attributes give an
    /// empty result.
    pub fn get_multi(&self, field: &str) -> MultiValue {
        match self.fields.get(field) {
            Some(Value::List(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => MultiValue::new(),
        }
    }

    /// Server-assigned identity, if the record is stored remotely.
    pub fn object_id(&self) -> Option<ObjectId> {
        self.fields.get(OBJECT_ID).and_then(Value::as_i64)
    }

    pub fn fields(&self) -> &BTreeMap<FieldName, Value> {
        &self.fields
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Attributes written since the last settle point.
    pub fn touched(&self) -> impl Iterator<Item = &FieldName> {
        self.prior.keys()
    }

    /// Value an attribute had before its first write since the last settle point.
    pub fn prior_value(&self, field: &str) -> Option<&Value> {
        self.prior.get(field)
    }

    /// Overwrite an existing attribute.
    ///
    /// Attributes are only known through a fetch; writing one the record does
    /// not have fails with [`Error::UnknownField`]. NaN and infinities have
    /// no JSON form and fail with [`Error::InvalidValue`].
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let Some(current) = self.fields.get_mut(field) else {
            return Err(Error::UnknownField(field.to_string()));
        };
        let value = value.into();
        if !value.is_finite() {
            return Err(Error::InvalidValue {
                field: field.to_string(),
                reason: "non-finite number cannot be sent as JSON".to_string(),
            });
        }

        if !self.prior.contains_key(field) {
            self.prior.insert(field.to_string(), current.clone());
        }
        *current = value;
        Ok(())
    }

    /// Mark the record for deletion on the next commit.
    pub fn delete(&mut self) {
        self.deleted = true;
    }

    /// Revert every write and the deletion mark since the last settle point.
    pub fn rollback(&mut self) {
        self.deleted = false;
        for (field, old) in std::mem::take(&mut self.prior) {
            self.fields.insert(field, old);
        }
    }

    /// Classify the record for the next commit.
    pub fn commit_state(&self) -> CommitState {
        if self.fields.get(OBJECT_ID).map_or(true, Value::is_null) {
            return CommitState::Created;
        }
        if self.deleted {
            return CommitState::Deleted;
        }
        if self.changed_fields().next().is_some() {
            return CommitState::Changed;
        }
        CommitState::Consistent
    }

    /// Build the commit delta for every attribute whose value really changed.
    pub fn serialize_changes(&self) -> ChangeSet {
        let changes = self
            .changed_fields()
            .map(|(field, old, new)| {
                let change = match (old.as_list(), new.as_list()) {
                    (Some(old), Some(new)) => {
                        let (add, remove) = slice_diff(old, new);
                        FieldChange::Multi { add, remove }
                    }
                    _ => FieldChange::Update {
                        old: old.clone(),
                        new: new.clone(),
                    },
                };
                (field.clone(), change)
            })
            .collect();

        ChangeSet {
            object_id: self.object_id(),
            changes,
        }
    }

    /// Settle the record after a successful remote commit.
    ///
    /// A deleted record loses its identity and reads as created afterwards.
    pub(crate) fn confirm_changes(&mut self) {
        self.prior.clear();
        if self.deleted {
            self.fields.insert(OBJECT_ID.to_string(), Value::Null);
            self.deleted = false;
        }
    }

    fn changed_fields(&self) -> impl Iterator<Item = (&FieldName, &Value, &Value)> {
        self.prior.iter().filter_map(|(field, old)| {
            let new = self.fields.get(field).unwrap_or(&NULL);
            (!old.same_as(new)).then_some((field, old, new))
        })
    }
}

impl From<BTreeMap<FieldName, Value>> for Record {
    fn from(fields: BTreeMap<FieldName, Value>) -> Self {
        Self::from_fields(fields)
    }
}

/// Elements added to and removed from `old` to get `new`, as sets.
///
/// Order and duplicate counts are ignored. Both results are sorted by
/// canonical form and are empty rather than absent when nothing moved.
pub fn slice_diff(old: &[Value], new: &[Value]) -> (Vec<Value>, Vec<Value>) {
    let old_set: BTreeMap<String, &Value> = old.iter().map(|v| (v.canonical(), v)).collect();
    let new_set: BTreeMap<String, &Value> = new.iter().map(|v| (v.canonical(), v)).collect();

    let add = new_set
        .iter()
        .filter(|(key, _)| !old_set.contains_key(*key))
        .map(|(_, v)| (*v).clone())
        .collect();
    let remove = old_set
        .iter()
        .filter(|(key, _)| !new_set.contains_key(*key))
        .map(|(_, v)| (*v).clone())
        .collect();

    (add, remove)
}
