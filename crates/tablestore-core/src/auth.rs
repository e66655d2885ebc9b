//! Credentials and request/response signing.
//!
//! The canonical string for a request is
//! `"/" + action + "\n" + method + "\n" + query + "\n" + headers`, where
//! `query` is the sorted `k=v` pairs joined by `&` and `headers` is the
//! sorted `x-ots-*` header lines (`name:value`) joined by `\n`, with a
//! trailing newline. Responses sign the sorted `x-ots-*` lines followed by
//! `"/" + action`. Signatures are base64(HMAC-SHA256(secret, canonical)).

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::OtsError;
use crate::protocol::headers;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            security_token: None,
        }
    }

    pub fn with_security_token(mut self, token: impl Into<String>) -> Self {
        self.security_token = Some(token.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("security_token", &self.security_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Lowercased `x-ots-*` lines, sorted by name, each followed by `\n`.
fn canonical_headers<'a, I>(all: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut lines: Vec<(String, &str)> = all
        .into_iter()
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim()))
        .filter(|(k, _)| k.starts_with(headers::PREFIX) && k != headers::SIGNATURE)
        .collect();
    lines.sort();
    lines
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect()
}

fn hmac_base64(secret: &str, canonical: &str) -> Result<String, OtsError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| OtsError::protocol(format!("signing key rejected: {}", e)))?;
    mac.update(canonical.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Signature for `x-ots-signature`.
pub fn sign_request<'a, H>(
    secret: &str,
    action: &str,
    method: &str,
    query: &[(&str, &str)],
    headers: H,
) -> Result<String, OtsError>
where
    H: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut query: Vec<_> = query.to_vec();
    query.sort();
    let query = query
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    let canonical = format!(
        "/{}\n{}\n{}\n{}",
        action,
        method,
        query,
        canonical_headers(headers)
    );
    hmac_base64(secret, &canonical)
}

/// Signature expected in a response's `authorization` header.
pub fn sign_response<'a, H>(secret: &str, action: &str, headers: H) -> Result<String, OtsError>
where
    H: IntoIterator<Item = (&'a str, &'a str)>,
{
    let canonical = format!("{}/{}", canonical_headers(headers), action);
    hmac_base64(secret, &canonical)
}

/// Full `authorization` header value for a response signature.
pub fn authorization_header(access_key_id: &str, signature: &str) -> String {
    format!("OTS {}:{}", access_key_id, signature)
}
