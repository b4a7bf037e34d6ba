//! Configuration management for the client.
//!
//! The configuration is resolved from the environment once per process and
//! cached. Tests that change the environment call [`reset`] to force a fresh
//! read.

use std::env;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Request timeout used when `SERVERADMIN_TIMEOUT_SECS` is not set.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the dataset service, without trailing slash
    pub base_url: String,
    /// Shared secret used to sign requests
    pub auth_token: Option<String>,
    /// Timeout of a whole request
    pub timeout: Duration,
}

impl Config {
    /// Create a configuration for a base URL, unsigned and with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("SERVERADMIN_BASE_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingBaseUrl)?;

        let auth_token = env::var("SERVERADMIN_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());

        let timeout = match env::var("SERVERADMIN_TIMEOUT_SECS") {
            Ok(secs) => secs
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(secs))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let mut config = Self::new(base_url).with_timeout(Duration::from_secs(timeout));
        config.auth_token = auth_token;
        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("SERVERADMIN_BASE_URL environment variable is required")]
    MissingBaseUrl,

    #[error("Invalid SERVERADMIN_TIMEOUT_SECS value: {0:?}")]
    InvalidTimeout(String),
}

impl From<ConfigError> for dataset_engine::Error {
    fn from(err: ConfigError) -> Self {
        dataset_engine::Error::Transport(format!("failed to get config: {err}"))
    }
}

static CONFIG: Mutex<Option<Arc<Config>>> = Mutex::new(None);

/// The process configuration, read from the environment on first use.
///
/// A `.env` file in the working directory is honored. Failures are not
/// cached, the next call tries again.
pub fn get() -> Result<Arc<Config>, ConfigError> {
    let mut slot = CONFIG.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(config) = slot.as_ref() {
        return Ok(Arc::clone(config));
    }

    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);
    tracing::debug!(base_url = %config.base_url, signed = config.auth_token.is_some(), "loaded configuration");

    *slot = Some(Arc::clone(&config));
    Ok(config)
}

/// Forget the cached configuration.
pub fn reset() {
    *CONFIG.lock().unwrap_or_else(PoisonError::into_inner) = None;
}
