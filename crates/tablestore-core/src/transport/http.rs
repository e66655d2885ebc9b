//! libcurl transport: one easy handle per request, driven on tokio's
//! blocking pool.

use std::cell::RefCell;
use std::str;
use std::time::Duration;

use async_trait::async_trait;
use curl::easy::{Easy, List};

use crate::consumer::ResponseConsumer;
use crate::error::{TransportError, TransportErrorKind};

use super::{Transport, WireRequest};

#[derive(Debug, Clone)]
pub struct CurlTransport {
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl CurlTransport {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            request_timeout,
        }
    }
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(15), Duration::from_secs(30))
    }
}

/// Map a curl failure onto the transport error kinds the retry policy sees.
pub fn classify_curl_error(e: &curl::Error) -> TransportErrorKind {
    if e.is_operation_timedout() {
        return TransportErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_ssl_connect_error()
    {
        return TransportErrorKind::Connection;
    }
    TransportErrorKind::Other
}

fn transport_error(e: curl::Error) -> TransportError {
    TransportError::new(classify_curl_error(&e), e.to_string())
}

/// One line delivered to curl's header callback.
#[derive(Debug, PartialEq, Eq)]
enum HeaderLine<'a> {
    Status(u16),
    Header(&'a str, &'a str),
    Blank,
}

fn parse_header_line(raw: &[u8]) -> Option<HeaderLine<'_>> {
    let line = str::from_utf8(raw).ok()?.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Some(HeaderLine::Blank);
    }
    if line.starts_with("HTTP/") {
        let code = line.split_whitespace().nth(1)?.parse().ok()?;
        return Some(HeaderLine::Status(code));
    }
    let (name, value) = line.split_once(':')?;
    Some(HeaderLine::Header(name.trim(), value.trim()))
}

fn perform(
    request: &WireRequest,
    consumer: ResponseConsumer,
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<ResponseConsumer, curl::Error> {
    let mut easy = Easy::new();
    easy.url(&request.url)?;
    easy.connect_timeout(connect_timeout)?;
    easy.timeout(request_timeout)?;
    easy.post(true)?;
    easy.post_fields_copy(&request.body)?;

    let mut list = List::new();
    for (k, v) in &request.headers {
        list.append(&format!("{}: {}", k, v))?;
    }
    // No 100-continue round trip.
    list.append("Expect:")?;
    easy.http_headers(list)?;

    let consumer = RefCell::new(consumer);
    {
        let mut transfer = easy.transfer();
        transfer.header_function(|raw| {
            match parse_header_line(raw) {
                Some(HeaderLine::Status(code)) => consumer.borrow_mut().on_status(code),
                Some(HeaderLine::Header(name, value)) => consumer.borrow_mut().on_header(name, value),
                Some(HeaderLine::Blank) | None => {}
            }
            true
        })?;
        transfer.write_function(|data| {
            consumer.borrow_mut().on_body(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }
    let mut consumer = consumer.into_inner();
    consumer.on_complete();
    Ok(consumer)
}

#[async_trait]
impl Transport for CurlTransport {
    async fn send(
        &self,
        request: WireRequest,
        consumer: ResponseConsumer,
    ) -> Result<ResponseConsumer, TransportError> {
        let (connect, total) = (self.connect_timeout, self.request_timeout);
        let action = request.action;
        tokio::task::spawn_blocking(move || perform(&request, consumer, connect, total))
            .await
            .map_err(|e| TransportError::new(TransportErrorKind::Other, format!("{} worker: {}", action, e)))?
            .map_err(transport_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lines() {
        assert_eq!(parse_header_line(b"HTTP/1.1 200 OK\r\n"), Some(HeaderLine::Status(200)));
        assert_eq!(parse_header_line(b"HTTP/2 503\r\n"), Some(HeaderLine::Status(503)));
        assert_eq!(parse_header_line(b"HTTP/1.1 abc\r\n"), None);
    }

    #[test]
    fn header_lines() {
        assert_eq!(
            parse_header_line(b"x-ots-date: 2024-01-01T00:00:00.000Z\r\n"),
            Some(HeaderLine::Header("x-ots-date", "2024-01-01T00:00:00.000Z"))
        );
        assert_eq!(parse_header_line(b"\r\n"), Some(HeaderLine::Blank));
        assert_eq!(parse_header_line(b"garbage\r\n"), None);
    }

    #[test]
    fn connection_refused_is_connection_kind() {
        let mut easy = Easy::new();
        easy.url("http://127.0.0.1:1/").unwrap();
        easy.connect_timeout(Duration::from_secs(2)).unwrap();
        let err = easy.perform().unwrap_err();
        assert_eq!(classify_curl_error(&err), TransportErrorKind::Connection);
    }
}
