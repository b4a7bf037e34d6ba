//! Batch operations over many records.

use crate::commit;
use crate::error::{Error, MemberError, Result};
use crate::transport::Transport;
use crate::{CommitId, Record, Value};
use std::ops::{Index, IndexMut};

/// An ordered set of records, typically the result of a query.
///
/// The set owns its records. A set built from clones, for example
/// `RecordSet::from(query.all(t)?.as_slice().to_vec())`, settles only the
/// clones on [`RecordSet::commit`]. The originals keep their pending changes
/// and would be sent again by their own commit. Edit records in place
/// through [`RecordSet::iter_mut`] or `Query::all` instead.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Create an empty record set.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Record> {
        self.records.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Record> {
        self.records.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn as_slice(&self) -> &[Record] {
        &self.records
    }

    pub fn into_vec(self) -> Vec<Record> {
        self.records
    }

    /// Set an attribute on every record.
    ///
    /// Every record is attempted. Failures are collected into
    /// [`Error::Batch`], naming the position and identity of each failing
    /// record; the others keep the new value.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let failures: Vec<MemberError> = self
            .records
            .iter_mut()
            .enumerate()
            .filter_map(|(index, record)| {
                record
                    .set(field, value.clone())
                    .err()
                    .map(|error| MemberError {
                        index,
                        object_id: record.object_id(),
                        error: Box::new(error),
                    })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Batch(failures))
        }
    }

    /// Mark every record for deletion.
    pub fn delete(&mut self) {
        self.records.iter_mut().for_each(Record::delete);
    }

    /// Revert every record.
    pub fn rollback(&mut self) {
        self.records.iter_mut().for_each(Record::rollback);
    }

    /// Commit all records in one request.
    pub fn commit(&mut self, transport: &dyn Transport) -> Result<CommitId> {
        commit::commit(transport, &mut self.records)
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a mut RecordSet {
    type Item = &'a mut Record;
    type IntoIter = std::slice::IterMut<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter_mut()
    }
}

impl Index<usize> for RecordSet {
    type Output = Record;

    fn index(&self, index: usize) -> &Record {
        &self.records[index]
    }
}

impl IndexMut<usize> for RecordSet {
    fn index_mut(&mut self, index: usize) -> &mut Record {
        &mut self.records[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;
    use crate::CommitState;
    use serde_json::json;

    fn record(fields: serde_json::Value) -> Record {
        Record::from_fields(serde_json::from_value(fields).unwrap())
    }

    fn servers() -> RecordSet {
        RecordSet::from(vec![
            record(json!({"hostname": "a", "memory": 16, "object_id": 1})),
            record(json!({"hostname": "b", "object_id": 2})),
            record(json!({"hostname": "c", "memory": 8, "object_id": 3})),
        ])
    }

    #[test]
    fn set_collects_member_failures() {
        let mut set = servers();

        let err = set.set("memory", 32).unwrap_err();
        match &err {
            Error::Batch(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].index, 1);
                assert_eq!(failures[0].object_id, Some(2));
                assert_eq!(*failures[0].error, Error::UnknownField("memory".into()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "object 1 (id=2): attribute \"memory\": unknown attribute"
        );

        assert_eq!(set[0].get("memory"), Some(Value::Int(32)));
        assert_eq!(set[0].prior_value("memory"), Some(&Value::Int(16)));
        assert_eq!(set[2].get("memory"), Some(Value::Int(32)));
        assert_eq!(set[2].prior_value("memory"), Some(&Value::Int(8)));
        assert_eq!(set[1].touched().count(), 0);
    }

    #[test]
    fn set_on_every_member() {
        let mut set = servers();
        set.set("hostname", "same").unwrap();
        assert!(set.iter().all(|r| r.get_string("hostname") == "same"));
    }

    #[test]
    fn delete_and_rollback_all() {
        let mut set = servers();
        set.set("hostname", "x").unwrap();
        set.delete();
        assert!(set.iter().all(|r| r.commit_state() == CommitState::Deleted));

        set.rollback();
        assert_eq!(set, servers());
    }

    #[test]
    fn commit_is_one_request() {
        let t = ScriptedTransport::new().reply(json!({"status": "success", "commit_id": 7}));
        let mut set = servers();
        set[0].set("hostname", "renamed").unwrap();
        set[2].delete();

        assert_eq!(set.commit(&t).unwrap(), 7);
        assert_eq!(t.calls(), 1);

        let payload = t.last_payload().unwrap();
        assert_eq!(payload["changed"].as_array().unwrap().len(), 1);
        assert_eq!(payload["deleted"], json!([3]));
        assert_eq!(payload["created"], json!([]));

        assert_eq!(set[0].commit_state(), CommitState::Consistent);
        assert_eq!(set[2].commit_state(), CommitState::Created);
    }

    #[test]
    fn committing_clones_leaves_originals_pending() {
        let t = ScriptedTransport::new().reply(json!({"status": "success", "commit_id": 8}));
        let mut original = servers();
        original[0].set("hostname", "renamed").unwrap();

        let mut copy = RecordSet::from(original.as_slice().to_vec());
        copy.commit(&t).unwrap();

        assert_eq!(copy[0].commit_state(), CommitState::Consistent);
        assert_eq!(original[0].commit_state(), CommitState::Changed);
    }

    #[test]
    fn empty_set() {
        let mut set = RecordSet::new();
        assert!(set.set("memory", 1).is_ok());
        set.delete();
        set.rollback();
        assert!(set.is_empty());
    }
}
