//! Creating new server objects.

use crate::error::{Error, Result};
use crate::filter::Filters;
use crate::query::{NewObjectResponse, Query};
use crate::transport::{Endpoint, Transport};
use crate::{FieldName, Record, Value, OBJECT_ID};

/// Attribute every new object must be given.
pub const HOSTNAME: &str = "hostname";

/// Fetch the attribute defaults of a servertype as an uncommitted record.
///
/// The record has no identity, so it commits as created.
pub fn new_object(transport: &dyn Transport, servertype: &str) -> Result<Record> {
    let endpoint = Endpoint::NewObject {
        servertype: servertype.to_string(),
    };
    let reply = transport.send(&endpoint, &serde_json::Value::Null)?;
    let response: NewObjectResponse = serde_json::from_value(reply)
        .map_err(|e| Error::Decode(format!("failed to decode new object response: {e}")))?;

    let mut fields = response.result;
    fields.insert(OBJECT_ID.to_string(), Value::Null);
    Ok(Record::from_fields(fields))
}

/// Create, commit and re-read a server object.
///
/// `attributes` must contain a hostname; every attribute must exist on the
/// servertype. The returned record is the stored object, with its
/// server-assigned identity.
pub fn create_object<I, K, V>(
    transport: &dyn Transport,
    servertype: &str,
    attributes: I,
) -> Result<Record>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<FieldName>,
    V: Into<Value>,
{
    let attributes: Vec<(FieldName, Value)> = attributes
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    let hostname = attributes
        .iter()
        .rev()
        .find(|(k, _)| k == HOSTNAME)
        .map(|(_, v)| v.clone())
        .ok_or_else(|| Error::MissingField(HOSTNAME.to_string()))?;

    let mut record = new_object(transport, servertype)?;
    for (field, value) in attributes {
        record.set(&field, value)?;
    }

    record
        .commit(transport)
        .map_err(|e| e.context("committing new object"))?;

    tracing::debug!(%servertype, %hostname, "created object, reading it back");
    let mut query = Query::new(Filters::new().with(HOSTNAME, hostname));
    let created = query
        .one(transport)
        .map_err(|e| e.context("re-querying created object"))?;
    Ok(created.clone())
}
