//! Query building and lazy result loading.

use crate::error::{Error, Result};
use crate::filter::{Condition, Filters};
use crate::parser::parse_query;
use crate::transport::{encode, Endpoint, Transport};
use crate::{FieldName, Record, RecordSet, Value, OBJECT_ID};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attributes fetched when the caller does not choose any.
pub const DEFAULT_ATTRIBUTES: [&str; 2] = [OBJECT_ID, "hostname"];

/// Body of a query request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub filters: Filters,
    pub restrict: Vec<FieldName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<FieldName>,
}

/// Reply to a query request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub result: Vec<BTreeMap<FieldName, Value>>,
}

/// Reply of the new-object endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct NewObjectResponse {
    pub result: BTreeMap<FieldName, Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
enum LoadState {
    #[default]
    NotLoaded,
    Loaded(RecordSet),
}

/// A query against the dataset.
///
/// The first call to [`Query::all`], [`Query::one`] or [`Query::count`]
/// fetches the results; later calls reuse them.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    filters: Filters,
    attributes: Vec<FieldName>,
    order_by: Option<FieldName>,
    state: LoadState,
}

impl Query {
    /// Create a query from a filter set.
    pub fn new(filters: Filters) -> Self {
        Self {
            filters,
            attributes: DEFAULT_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
            order_by: None,
            state: LoadState::NotLoaded,
        }
    }

    /// Create a query from query text such as `hostname=regexp(^web) state=online`.
    pub fn from_query(query: &str) -> Result<Self> {
        parse_query(query).map(Self::new)
    }

    /// Replace the attributes to fetch.
    pub fn set_attributes<I, S>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
    }

    /// Fetch additional attributes.
    pub fn add_attributes<I, S>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        self.attributes
            .extend(attributes.into_iter().map(Into::into));
    }

    /// Sort results by an attribute.
    pub fn order_by(&mut self, attribute: impl Into<FieldName>) {
        self.order_by = Some(attribute.into());
    }

    /// Add or replace the condition of an attribute.
    pub fn add_filter(&mut self, attribute: impl Into<FieldName>, condition: impl Into<Condition>) {
        self.filters.insert(attribute, condition);
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn attributes(&self) -> &[FieldName] {
        &self.attributes
    }

    /// Whether the results were fetched already.
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded(_))
    }

    /// The request this query sends.
    ///
    /// The identity attribute is always fetched, records cannot be changed
    /// without it.
    pub fn request(&self) -> QueryRequest {
        let mut restrict = self.attributes.clone();
        if !restrict.iter().any(|a| a == OBJECT_ID) {
            restrict.push(OBJECT_ID.to_string());
        }

        QueryRequest {
            filters: self.filters.clone(),
            restrict,
            order_by: self.order_by.clone(),
        }
    }

    /// All matching records.
    pub fn all(&mut self, transport: &dyn Transport) -> Result<&mut RecordSet> {
        self.load(transport)
    }

    /// The only matching record.
    ///
    /// Fails with [`Error::NoResults`] or [`Error::MultipleResults`] unless
    /// exactly one record matched.
    pub fn one(&mut self, transport: &dyn Transport) -> Result<&mut Record> {
        let records = self.load(transport)?;
        match records.len() {
            0 => Err(Error::NoResults),
            1 => Ok(&mut records[0]),
            n => Err(Error::MultipleResults(n)),
        }
    }

    /// Number of matching records.
    pub fn count(&mut self, transport: &dyn Transport) -> Result<usize> {
        self.load(transport).map(|records| records.len())
    }

    fn load(&mut self, transport: &dyn Transport) -> Result<&mut RecordSet> {
        if let LoadState::NotLoaded = self.state {
            let records = fetch(transport, &self.request())?;
            self.state = LoadState::Loaded(records);
        }

        match &mut self.state {
            LoadState::Loaded(records) => Ok(records),
            LoadState::NotLoaded => unreachable!("query state set above"),
        }
    }
}

fn fetch(transport: &dyn Transport, request: &QueryRequest) -> Result<RecordSet> {
    tracing::debug!(
        filters = request.filters.len(),
        restrict = ?request.restrict,
        order_by = ?request.order_by,
        "loading query"
    );

    let reply = transport.send(&Endpoint::Query, &encode(request)?)?;
    let response: QueryResponse = serde_json::from_value(reply)
        .map_err(|e| Error::Decode(format!("failed to decode query response: {e}")))?;

    if response.status.as_deref() == Some("error") {
        let message = response.message.unwrap_or_else(|| "query failed".to_string());
        return Err(Error::QueryFailed(message));
    }

    tracing::debug!(results = response.result.len(), "query loaded");
    Ok(response.result.into_iter().map(Record::from_fields).collect())
}
