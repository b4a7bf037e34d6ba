//! The seam between the engine and the dataset service.
//!
//! The engine never performs IO. Queries and commits build a JSON payload,
//! hand it to a [`Transport`] and decode whatever comes back. Delivery,
//! authentication, retries and timeouts belong to the implementation.

use crate::error::{Error, Result};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::VecDeque;

/// Path of the query endpoint.
pub const QUERY_PATH: &str = "/api/dataset/query";
/// Path of the commit endpoint.
pub const COMMIT_PATH: &str = "/api/dataset/commit";
/// Path of the endpoint returning the attribute defaults of a servertype.
pub const NEW_OBJECT_PATH: &str = "/api/dataset/new_object";

/// A service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Query,
    Commit,
    NewObject { servertype: String },
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Query => QUERY_PATH,
            Endpoint::Commit => COMMIT_PATH,
            Endpoint::NewObject { .. } => NEW_OBJECT_PATH,
        }
    }

    /// URL query parameters of the endpoint.
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        match self {
            Endpoint::NewObject { servertype } => vec![("servertype", servertype.as_str())],
            _ => Vec::new(),
        }
    }
}

/// Sends one request to the service and returns the decoded reply.
///
/// Every call is a single blocking round trip. Implementations report
/// non-success HTTP statuses as [`Error::Remote`] and unreadable bodies as
/// [`Error::Decode`].
pub trait Transport {
    fn send(&self, endpoint: &Endpoint, payload: &serde_json::Value) -> Result<serde_json::Value>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, endpoint: &Endpoint, payload: &serde_json::Value) -> Result<serde_json::Value> {
        (**self).send(endpoint, payload)
    }
}

/// Serialize a request body.
pub(crate) fn encode<T: Serialize>(request: &T) -> Result<serde_json::Value> {
    serde_json::to_value(request)
        .map_err(|e| Error::Transport(format!("failed to marshal request data: {e}")))
}

/// An in-memory [`Transport`] replaying canned replies in order.
///
/// Every request is recorded for later inspection. Useful for tests and
/// dry runs.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<Result<serde_json::Value>>>,
    requests: RefCell<Vec<(Endpoint, serde_json::Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, body: serde_json::Value) -> Self {
        self.replies.borrow_mut().push_back(Ok(body));
        self
    }

    /// Queue a failure.
    pub fn fail(self, error: Error) -> Self {
        self.replies.borrow_mut().push_back(Err(error));
        self
    }

    /// All requests sent so far.
    pub fn requests(&self) -> Vec<(Endpoint, serde_json::Value)> {
        self.requests.borrow().clone()
    }

    /// Number of requests sent so far.
    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Payload of the most recent request.
    pub fn last_payload(&self) -> Option<serde_json::Value> {
        self.requests.borrow().last().map(|(_, p)| p.clone())
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, endpoint: &Endpoint, payload: &serde_json::Value) -> Result<serde_json::Value> {
        self.requests
            .borrow_mut()
            .push((endpoint.clone(), payload.clone()));
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport(format!("no reply scripted for {}", endpoint.path()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::Query.path(), "/api/dataset/query");
        assert_eq!(Endpoint::Commit.path(), "/api/dataset/commit");

        let new = Endpoint::NewObject {
            servertype: "vm".into(),
        };
        assert_eq!(new.path(), "/api/dataset/new_object");
        assert_eq!(new.params(), vec![("servertype", "vm")]);
        assert!(Endpoint::Query.params().is_empty());
    }

    #[test]
    fn scripted_replies_in_order() {
        let t = ScriptedTransport::new()
            .reply(json!({"n": 1}))
            .fail(Error::Remote {
                status: 500,
                message: String::new(),
            });

        assert_eq!(t.send(&Endpoint::Query, &json!(null)).unwrap(), json!({"n": 1}));
        assert!(matches!(
            t.send(&Endpoint::Commit, &json!({})),
            Err(Error::Remote { status: 500, .. })
        ));
        assert!(matches!(
            t.send(&Endpoint::Commit, &json!({})),
            Err(Error::Transport(_))
        ));

        assert_eq!(t.calls(), 3);
        assert_eq!(t.requests()[1].0, Endpoint::Commit);
        assert_eq!(t.last_payload(), Some(json!({})));
    }

    #[test]
    fn references_are_transports() {
        fn call(t: impl Transport) -> Result<serde_json::Value> {
            t.send(&Endpoint::Query, &json!(null))
        }

        let t = ScriptedTransport::new().reply(json!([]));
        assert_eq!(call(&t).unwrap(), json!([]));
    }
}
