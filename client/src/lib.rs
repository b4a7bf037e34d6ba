//! # Dataset Client
//!
//! Connects [`dataset_engine`] to a live dataset service.
//!
//! - [`config`]: base URL, token and timeout from the environment
//! - [`auth`]: HMAC-SHA1 request signing
//! - [`HttpTransport`]: the engine's [`Transport`](dataset_engine::Transport) over HTTP
//!
//! ```no_run
//! use dataset_client::HttpTransport;
//! use dataset_engine::Query;
//!
//! dataset_client::init_tracing();
//! let transport = HttpTransport::from_env()?;
//!
//! let mut query = Query::from_query("hostname=regexp(^web) state=online")?;
//! for server in query.all(&transport)?.iter() {
//!     println!("{}", server.get_string("hostname"));
//! }
//! # Ok::<(), dataset_engine::Error>(())
//! ```

pub mod auth;
pub mod config;
pub mod transport;

pub use config::{Config, ConfigError};
pub use transport::HttpTransport;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a formatting subscriber filtered by `RUST_LOG`.
///
/// Does nothing when a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dataset_client=info,dataset_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
