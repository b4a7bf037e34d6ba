//! Error types for the dataset engine.

use crate::ObjectId;
use std::fmt;
use thiserror::Error;

/// All possible errors from the dataset engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Query text errors
    #[error("parse error at byte {position} ({token:?}): {reason}")]
    Parse {
        token: String,
        position: usize,
        reason: String,
    },

    // Record errors
    #[error("attribute {0:?}: unknown attribute")]
    UnknownField(String),

    #[error("{}", join_members(.0))]
    Batch(Vec<MemberError>),

    #[error("attribute {field:?}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("attributes must include {0:?}")]
    MissingField(String),

    // Cardinality errors
    #[error("no server objects found")]
    NoResults,

    #[error("expected exactly one server object, got {0}")]
    MultipleResults(usize),

    // Remote errors
    #[error("{}", remote_message(.status, .message))]
    Remote { status: u16, message: String },

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("commit failed: {0}")]
    CommitFailed(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Wrap an error with a description of what was being attempted.
    pub fn context(self, what: impl fmt::Display) -> Self {
        match self {
            Error::Transport(msg) => Error::Transport(format!("{what}: {msg}")),
            Error::Decode(msg) => Error::Decode(format!("{what}: {msg}")),
            Error::CommitFailed(msg) => Error::CommitFailed(format!("{what}: {msg}")),
            Error::QueryFailed(msg) => Error::QueryFailed(format!("{what}: {msg}")),
            other => other,
        }
    }

    /// Whether the error is one of the `one()` cardinality conditions.
    pub fn is_cardinality(&self) -> bool {
        matches!(self, Error::NoResults | Error::MultipleResults(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

/// A failure of one member of a batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberError {
    /// Position of the record in its collection
    pub index: usize,
    /// Identity of the record, if it has one
    pub object_id: Option<ObjectId>,
    /// What went wrong
    pub error: Box<Error>,
}

impl fmt::Display for MemberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object_id {
            Some(id) => write!(f, "object {} (id={}): {}", self.index, id, self.error),
            None => write!(f, "object {} (id=<nil>): {}", self.index, self.error),
        }
    }
}

fn join_members(errors: &[MemberError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn remote_message(status: &u16, message: &str) -> String {
    if message.is_empty() {
        format!("HTTP error {status}")
    } else {
        format!("HTTP error {status}: {message}")
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
