//! # Dataset Engine
//!
//! Client-side core for querying and changing objects of a remote
//! configuration dataset.
//!
//! This crate turns compact query text into filter trees, wraps fetched
//! objects into change-tracking records and computes the minimal deltas sent
//! back on commit.
//!
//! ## Design Principles
//!
//! - **No IO**: All service traffic goes through the [`Transport`] trait
//! - **Typed values**: Attributes are a closed [`Value`] union, decoded once
//! - **One request per commit**: Created, changed and deleted records travel together
//! - **Settle after success**: Records forget their pending changes only once the
//!   service accepted them
//!
//! ## Core Concepts
//!
//! ### Filters
//!
//! A [`Filters`] set maps attribute names to plain values or [`Filter`]s.
//! Filters are built with the constructors in [`filter`] or parsed from text
//! with [`parse_query`].
//!
//! ### Records
//!
//! A [`Record`] remembers the value each attribute had before its first
//! write. From that it derives its [`CommitState`] and its [`ChangeSet`].
//! Multi-valued attributes are diffed as sets.
//!
//! ### Queries
//!
//! A [`Query`] fetches once, on first use, and hands out [`RecordSet`]s.
//!
//! ## Quick Start
//!
//! ```rust
//! use dataset_engine::{Query, ScriptedTransport, CommitState};
//! use serde_json::json;
//!
//! // A transport answering like the service would
//! let transport = ScriptedTransport::new()
//!     .reply(json!({
//!         "status": "success",
//!         "result": [{"object_id": 7, "hostname": "web01", "tags": ["web", "old"]}],
//!     }))
//!     .reply(json!({"status": "success", "commit_id": 1}));
//!
//! // 1. Query
//! let mut query = Query::from_query("hostname=regexp(^web) tags=contains(old)").unwrap();
//! query.add_attributes(["tags"]);
//!
//! // 2. Change
//! let server = query.one(&transport).unwrap();
//! let mut tags = server.get_multi("tags");
//! tags.delete("old");
//! tags.add(["new"]);
//! server.set("tags", tags).unwrap();
//! assert_eq!(server.commit_state(), CommitState::Changed);
//!
//! // 3. Commit
//! let commit_id = server.commit(&transport).unwrap();
//! assert_eq!(commit_id, 1);
//! assert_eq!(
//!     transport.last_payload().unwrap()["changed"][0]["tags"],
//!     json!({"action": "multi", "add": ["new"], "remove": ["old"]})
//! );
//! ```

pub mod collection;
pub mod commit;
pub mod create;
pub mod error;
pub mod filter;
pub mod parser;
pub mod query;
pub mod record;
pub mod transport;
pub mod value;

// Re-export main types at crate root
pub use collection::RecordSet;
pub use commit::{build_commit, CommitRequest, CommitResponse};
pub use create::{create_object, new_object};
pub use error::{Error, MemberError, Result};
pub use filter::{Condition, Filter, FilterOp, Filters, Operand};
pub use parser::parse_query;
pub use query::{Query, QueryRequest, QueryResponse, DEFAULT_ATTRIBUTES};
pub use record::{slice_diff, ChangeSet, CommitState, FieldChange, Record};
pub use transport::{Endpoint, ScriptedTransport, Transport};
pub use value::{MultiValue, Value};

/// Name of the identity attribute.
pub const OBJECT_ID: &str = "object_id";

/// Type aliases for clarity
pub type FieldName = String;
pub type ObjectId = i64;
pub type CommitId = i64;
