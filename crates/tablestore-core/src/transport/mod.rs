//! HTTP transport seam.
//!
//! A transport sends one fully built request and feeds the response into the
//! attempt's [`ResponseConsumer`] as it arrives. It knows nothing about
//! retries, signing or decoding; any failure before a complete response is a
//! [`TransportError`].

mod http;
#[cfg(test)]
pub(crate) mod scripted;

pub use self::http::{classify_curl_error, CurlTransport};

use std::sync::Arc;

use async_trait::async_trait;

use crate::consumer::ResponseConsumer;
use crate::error::TransportError;

/// A signed request ready to go on the wire.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub url: String,
    pub action: &'static str,
    pub method: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WireRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Issue `request`, feeding status, headers and body chunks into
    /// `consumer`, and return it once the response is complete.
    async fn send(
        &self,
        request: WireRequest,
        consumer: ResponseConsumer,
    ) -> Result<ResponseConsumer, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        request: WireRequest,
        consumer: ResponseConsumer,
    ) -> Result<ResponseConsumer, TransportError> {
        (**self).send(request, consumer).await
    }
}
