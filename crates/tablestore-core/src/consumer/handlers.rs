//! Response validation handlers, run in order once the body is complete.
//!
//! Any handler may reject the response; later handlers and decoding are
//! skipped. A non-2xx status is turned into a [`ServiceError`] before the
//! body is decoded as a typed response.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::auth::{self, Credentials};
use crate::checksum;
use crate::compression::Compression;
use crate::error::{codes, OtsError, ServiceError};
use crate::protocol::messages as pb;
use crate::protocol::{decode, headers};

/// A fully received response, before decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub action: &'static str,
    pub status: u16,
    /// Lowercased header names.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn require_header(&self, name: &str) -> Result<&str, OtsError> {
        self.header(name)
            .ok_or_else(|| OtsError::protocol(format!("{}: missing response header {}", self.action, name)))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn request_id(&self) -> &str {
        self.header(headers::REQUEST_ID).unwrap_or("")
    }
}

pub trait ResponseHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle(&self, response: &mut RawResponse) -> Result<(), OtsError>;
}

/// Declared vs computed content digest. Required on 2xx responses; error
/// responses from gateways may omit it.
#[derive(Debug, Default)]
pub struct ChecksumHandler;

impl ResponseHandler for ChecksumHandler {
    fn name(&self) -> &'static str {
        "checksum"
    }

    fn handle(&self, response: &mut RawResponse) -> Result<(), OtsError> {
        let declared = if response.is_success() {
            response.require_header(headers::CONTENT_DIGEST)?
        } else {
            match response.header(headers::CONTENT_DIGEST) {
                Some(d) => d,
                None => return Ok(()),
            }
        };
        checksum::verify(declared, &response.body)
    }
}

/// Inflate the body when the response declares a compression type.
#[derive(Debug, Default)]
pub struct DecompressHandler;

impl ResponseHandler for DecompressHandler {
    fn name(&self) -> &'static str {
        "decompress"
    }

    fn handle(&self, response: &mut RawResponse) -> Result<(), OtsError> {
        let Some(kind) = response.header(headers::RESPONSE_COMPRESS_TYPE) else {
            return Ok(());
        };
        let compression = Compression::from_header(kind)
            .ok_or_else(|| OtsError::protocol(format!("unsupported response compression {:?}", kind)))?;
        let size = response.require_header(headers::RESPONSE_COMPRESS_SIZE)?;
        let size: usize = size
            .trim()
            .parse()
            .map_err(|_| OtsError::protocol(format!("bad {} header {:?}", headers::RESPONSE_COMPRESS_SIZE, size)))?;
        response.body = compression.decompress(&response.body, size)?;
        Ok(())
    }
}

/// Turn a non-2xx response into the service's structured error.
#[derive(Debug, Default)]
pub struct ServerErrorHandler;

impl ResponseHandler for ServerErrorHandler {
    fn name(&self) -> &'static str {
        "server-error"
    }

    fn handle(&self, response: &mut RawResponse) -> Result<(), OtsError> {
        if response.is_success() {
            return Ok(());
        }
        let request_id = response.request_id();
        if response.status == 301 {
            if let Some(location) = response.header(headers::LOCATION) {
                return Err(ServiceError::new(codes::MOVED_PERMANENTLY, location, request_id, 301).into());
            }
        }
        let error = match decode::<pb::Error>(&response.body) {
            Ok(e) if !e.code.is_empty() => ServiceError::new(e.code, e.message, request_id, response.status),
            _ => ServiceError::new(
                codes::UNKNOWN_SERVER_ERROR,
                format!("HTTP {} with an unreadable error body", response.status),
                request_id,
                response.status,
            ),
        };
        Err(error.into())
    }
}

/// Response date within the freshness window, and the server's signature.
pub struct FreshnessHandler {
    credentials: Credentials,
    window: Duration,
    clock: fn() -> DateTime<Utc>,
}

impl FreshnessHandler {
    pub fn new(credentials: Credentials, window: Duration) -> Self {
        Self {
            credentials,
            window,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }
}

impl fmt::Debug for FreshnessHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreshnessHandler")
            .field("credentials", &self.credentials)
            .field("window", &self.window)
            .finish()
    }
}

impl ResponseHandler for FreshnessHandler {
    fn name(&self) -> &'static str {
        "freshness"
    }

    fn handle(&self, response: &mut RawResponse) -> Result<(), OtsError> {
        response.require_header(headers::CONTENT_TYPE)?;
        response.require_header(headers::REQUEST_ID)?;

        let date = response.require_header(headers::DATE)?;
        let date = DateTime::parse_from_rfc3339(date.trim())
            .map_err(|e| OtsError::protocol(format!("bad response date {:?}: {}", date, e)))?
            .with_timezone(&Utc);
        let skew = ((self.clock)() - date).num_milliseconds().unsigned_abs();
        if u128::from(skew) > self.window.as_millis() {
            return Err(OtsError::protocol(format!(
                "response date {} is {}s away from local clock",
                date,
                skew / 1000
            )));
        }

        let authorization = response.require_header(headers::AUTHORIZATION)?;
        let signature = auth::sign_response(
            &self.credentials.access_key_secret,
            response.action,
            response.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )?;
        let expected = auth::authorization_header(&self.credentials.access_key_id, &signature);
        if authorization.trim() != expected {
            return Err(OtsError::protocol("response signature mismatch"));
        }
        Ok(())
    }
}

/// Ordered list of handlers shared by every attempt of a client.
pub struct ValidationChain {
    handlers: Vec<Box<dyn ResponseHandler>>,
}

impl ValidationChain {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Checksum, decompression, server-error translation, freshness/signature.
    pub fn standard(credentials: Credentials, freshness_window: Duration) -> Self {
        Self::new()
            .with(ChecksumHandler)
            .with(DecompressHandler)
            .with(ServerErrorHandler)
            .with(FreshnessHandler::new(credentials, freshness_window))
    }

    pub fn with(mut self, handler: impl ResponseHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn validate(&self, response: &mut RawResponse) -> Result<(), OtsError> {
        for handler in &self.handlers {
            if let Err(e) = handler.handle(response) {
                tracing::debug!(
                    action = response.action,
                    status = response.status,
                    handler = handler.name(),
                    error = %e,
                    "response rejected"
                );
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Default for ValidationChain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValidationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}
