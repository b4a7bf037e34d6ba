//! Commit orchestration.
//!
//! All pending records are classified by [`Record::commit_state`] and sent in
//! one request. Records are only settled after the service accepted it.

use crate::error::{Error, MemberError, Result};
use crate::record::{ChangeSet, CommitState, Record};
use crate::transport::{encode, Endpoint, Transport};
use crate::{CommitId, FieldName, ObjectId, Value, OBJECT_ID};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of a commit request.
///
/// All three lists are always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CommitRequest {
    /// Full attribute maps of new records
    pub created: Vec<BTreeMap<FieldName, Value>>,
    /// Deltas of changed records
    pub changed: Vec<ChangeSet>,
    /// Identities of deleted records
    pub deleted: Vec<ObjectId>,
}

impl CommitRequest {
    /// Check if the request carries nothing.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.changed.is_empty() && self.deleted.is_empty()
    }
}

/// Reply to a commit request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitResponse {
    pub status: String,
    #[serde(default)]
    pub commit_id: CommitId,
    #[serde(default)]
    pub message: Option<String>,
}

/// Partition records into a commit request.
///
/// A changed or deleted record must carry an integer identity. Records whose
/// `object_id` is set to anything else fail the whole request with
/// [`Error::Batch`], so nothing is sent and nothing is settled.
pub fn build_commit<'a>(records: impl IntoIterator<Item = &'a Record>) -> Result<CommitRequest> {
    let mut request = CommitRequest::default();
    let mut failures = Vec::new();

    for (index, record) in records.into_iter().enumerate() {
        let state = record.commit_state();
        if matches!(state, CommitState::Changed | CommitState::Deleted)
            && record.object_id().is_none()
        {
            failures.push(MemberError {
                index,
                object_id: None,
                error: Box::new(invalid_identity(record)),
            });
            continue;
        }

        match state {
            CommitState::Created => request.created.push(record.fields().clone()),
            CommitState::Changed => request.changed.push(record.serialize_changes()),
            CommitState::Deleted => request.deleted.extend(record.object_id()),
            CommitState::Consistent => {}
        }
    }

    if !failures.is_empty() {
        return Err(Error::Batch(failures));
    }
    Ok(request)
}

fn invalid_identity(record: &Record) -> Error {
    let raw = record
        .fields()
        .get(OBJECT_ID)
        .map(Value::canonical)
        .unwrap_or_default();
    Error::InvalidValue {
        field: OBJECT_ID.to_string(),
        reason: format!("{raw} is not an integer identity"),
    }
}

/// Submit a commit request and return the commit id.
pub fn send_commit(transport: &dyn Transport, request: &CommitRequest) -> Result<CommitId> {
    tracing::info!(
        created = request.created.len(),
        changed = request.changed.len(),
        deleted = request.deleted.len(),
        "submitting commit"
    );

    let reply = transport.send(&Endpoint::Commit, &encode(request)?)?;
    let response: CommitResponse = serde_json::from_value(reply)
        .map_err(|e| Error::Decode(format!("failed to decode commit response: {e}")))?;

    if response.status != "success" {
        let message = response.message.unwrap_or(response.status);
        tracing::warn!(%message, "commit rejected");
        return Err(Error::CommitFailed(message));
    }

    tracing::info!(commit_id = response.commit_id, "commit accepted");
    Ok(response.commit_id)
}

/// Commit every pending change of `records` as one request.
///
/// Records are settled only once the service accepted the whole request.
pub fn commit(transport: &dyn Transport, records: &mut [Record]) -> Result<CommitId> {
    let request = build_commit(records.iter())?;
    let commit_id = send_commit(transport, &request)?;

    for record in records.iter_mut() {
        record.confirm_changes();
    }
    Ok(commit_id)
}

impl Record {
    /// Commit this record's pending changes on its own.
    pub fn commit(&mut self, transport: &dyn Transport) -> Result<CommitId> {
        commit(transport, std::slice::from_mut(self))
    }
}
