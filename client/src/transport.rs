//! HTTP implementation of the engine's transport.

use crate::auth;
use crate::config::{self, Config};
use dataset_engine::{Endpoint, Error, Result, Transport};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const USER_AGENT: &str = concat!("dataset-client/", env!("CARGO_PKG_VERSION"));
const JSON_CONTENT_TYPE: &str = "application/x-json";

/// Sends engine requests to the dataset service over HTTP.
///
/// Requests are signed when the configuration has a token. Responses are
/// gzip-decoded transparently.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: Arc<Config>,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .gzip(true)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Create a transport from the process configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(config::get()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn url(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.config.base_url, endpoint.path())
    }
}

impl Transport for HttpTransport {
    fn send(&self, endpoint: &Endpoint, payload: &serde_json::Value) -> Result<serde_json::Value> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| Error::Transport(format!("failed to marshal request data: {e}")))?;
        let url = self.url(endpoint);

        let mut request = self
            .client
            .get(&url)
            .query(&endpoint.params())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        for (name, value) in auth::headers(self.config.auth_token.as_deref(), unix_now(), &body)? {
            request = request.header(name, value);
        }

        tracing::debug!(%url, bytes = body.len(), "sending request");
        let response = request
            .body(body)
            .send()
            .map_err(|e| Error::Transport(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .map_err(|e| Error::Transport(format!("failed to read response body: {e}")))?;
        tracing::debug!(status = status.as_u16(), bytes = bytes.len(), "received response");

        if !status.is_success() {
            let message = error_message(&bytes);
            tracing::warn!(status = status.as_u16(), %message, "request rejected");
            return Err(Error::Remote {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// Text of a `{"error": {"message": ...}}` body, or nothing.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .map(|body| body.error.message)
        .unwrap_or_default()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_error_message() {
        assert_eq!(
            error_message(br#"{"error": {"message": "Forbidden: No known public key found"}}"#),
            "Forbidden: No known public key found"
        );
    }

    #[test]
    fn unreadable_error_bodies_have_no_message() {
        assert_eq!(error_message(b""), "");
        assert_eq!(error_message(b"<html>oops</html>"), "");
        assert_eq!(error_message(br#"{"error": "flat"}"#), "");
        assert_eq!(error_message(br#"{"error": {}}"#), "");
    }

    #[test]
    fn endpoint_urls() {
        let transport = HttpTransport::new(Arc::new(Config::new("http://dataset.local/"))).unwrap();
        assert_eq!(
            transport.url(&Endpoint::Query),
            "http://dataset.local/api/dataset/query"
        );
        assert_eq!(
            transport.url(&Endpoint::NewObject {
                servertype: "vm".into()
            }),
            "http://dataset.local/api/dataset/new_object"
        );
    }
}
