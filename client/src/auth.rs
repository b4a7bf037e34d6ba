//! Request signing.
//!
//! A signed request carries the Unix timestamp it was made at, an HMAC-SHA1
//! of `"<timestamp>:<body>"` keyed with the shared token, and the SHA-1 of
//! the token identifying the application.

use dataset_engine::{Error, Result};
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};

type HmacSha1 = Hmac<Sha1>;

pub const TIMESTAMP_HEADER: &str = "X-Timestamp";
pub const SECURITY_TOKEN_HEADER: &str = "X-SecurityToken";
pub const APPLICATION_HEADER: &str = "X-Application";

/// The signed message: decimal timestamp, a colon, then the body.
pub fn message(timestamp: i64, body: &[u8]) -> Vec<u8> {
    let mut message = timestamp.to_string().into_bytes();
    message.push(b':');
    message.extend_from_slice(body);
    message
}

/// Hex HMAC-SHA1 of the signed message.
pub fn security_token(token: &[u8], timestamp: i64, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(token)
        .map_err(|e| Error::Transport(format!("invalid auth token: {e}")))?;
    mac.update(&message(timestamp, body));
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Hex SHA-1 of the token.
pub fn app_id(token: &[u8]) -> String {
    hex::encode(Sha1::digest(token))
}

/// Headers authenticating one request.
///
/// Unsigned requests only carry the timestamp.
pub fn headers(
    token: Option<&str>,
    timestamp: i64,
    body: &[u8],
) -> Result<Vec<(&'static str, String)>> {
    let mut headers = vec![(TIMESTAMP_HEADER, timestamp.to_string())];
    if let Some(token) = token {
        headers.push((
            SECURITY_TOKEN_HEADER,
            security_token(token.as_bytes(), timestamp, body)?,
        ));
        headers.push((APPLICATION_HEADER, app_id(token.as_bytes())));
    }
    Ok(headers)
}
