//! In-memory transport for tests: plays back scripted replies, checks each
//! request the way the service would, and records what was sent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use prost::Message;

use crate::auth::{self, Credentials};
use crate::checksum;
use crate::compression::Compression;
use crate::consumer::ResponseConsumer;
use crate::error::{TransportError, TransportErrorKind};
use crate::protocol::messages as pb;
use crate::protocol::{encode, headers, CONTENT_TYPE_PROTOBUF};

use super::{Transport, WireRequest};

/// One scripted response. Headers are filled in and signed by `render`.
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    status: u16,
    body: Vec<u8>,
    extra: Vec<(String, String)>,
    omit: Vec<&'static str>,
    compressed: bool,
    date_offset: chrono::Duration,
    bad_signature: bool,
}

impl Reply {
    pub(crate) fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            body,
            extra: Vec::new(),
            omit: Vec::new(),
            compressed: false,
            date_offset: chrono::Duration::zero(),
            bad_signature: false,
        }
    }

    pub(crate) fn ok(body: Vec<u8>) -> Self {
        Self::new(200, body)
    }

    pub(crate) fn message<M: Message>(message: &M) -> Self {
        Self::ok(encode(message))
    }

    pub(crate) fn service_error(status: u16, code: &str, message: &str) -> Self {
        Self::new(
            status,
            encode(&pb::Error {
                code: code.into(),
                message: message.into(),
            }),
        )
    }

    pub(crate) fn moved(location: &str) -> Self {
        Self::new(301, Vec::new()).header(headers::LOCATION, location)
    }

    pub(crate) fn header(mut self, name: &str, value: &str) -> Self {
        self.extra.push((name.to_string(), value.to_string()));
        self
    }

    pub(crate) fn without(mut self, name: &'static str) -> Self {
        self.omit.push(name);
        self
    }

    pub(crate) fn compressed(mut self) -> Self {
        self.compressed = true;
        self
    }

    pub(crate) fn date_offset(mut self, offset: chrono::Duration) -> Self {
        self.date_offset = offset;
        self
    }

    pub(crate) fn bad_signature(mut self) -> Self {
        self.bad_signature = true;
        self
    }

    /// Status, headers and body as the service would send them.
    pub(crate) fn render(
        self,
        action: &str,
        credentials: &Credentials,
        request_id: &str,
    ) -> (u16, Vec<(String, String)>, Vec<u8>) {
        let mut body = self.body;
        let mut out: Vec<(String, String)> = Vec::new();
        if self.compressed {
            out.push((headers::RESPONSE_COMPRESS_TYPE.into(), "deflate".into()));
            out.push((headers::RESPONSE_COMPRESS_SIZE.into(), body.len().to_string()));
            body = Compression::Deflate.compress(&body).unwrap();
        }
        let date = (Utc::now() + self.date_offset)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        out.push((headers::CONTENT_DIGEST.into(), checksum::content_digest(&body)));
        out.push((headers::CONTENT_TYPE.into(), CONTENT_TYPE_PROTOBUF.into()));
        out.push((headers::REQUEST_ID.into(), request_id.into()));
        out.push((headers::DATE.into(), date));
        out.extend(self.extra);
        out.retain(|(k, _)| !self.omit.iter().any(|o| *o == k.as_str()));

        if !self.omit.contains(&headers::AUTHORIZATION) {
            let secret = if self.bad_signature {
                "not-the-secret"
            } else {
                credentials.access_key_secret.as_str()
            };
            let signature =
                auth::sign_response(secret, action, out.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    .unwrap();
            out.push((
                headers::AUTHORIZATION.into(),
                auth::authorization_header(&credentials.access_key_id, &signature),
            ));
        }
        (self.status, out, body)
    }
}

#[derive(Debug)]
pub(crate) enum Step {
    Reply(Reply),
    Fault(TransportError),
}

#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    credentials: Credentials,
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<WireRequest>>,
    next_id: AtomicU32,
}

impl ScriptedTransport {
    pub(crate) fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            steps: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            next_id: AtomicU32::new(1),
        }
    }

    pub(crate) fn reply(self, reply: Reply) -> Self {
        self.steps.lock().unwrap().push_back(Step::Reply(reply));
        self
    }

    pub(crate) fn fault(self, kind: TransportErrorKind) -> Self {
        self.steps
            .lock()
            .unwrap()
            .push_back(Step::Fault(TransportError::new(kind, "scripted fault")));
        self
    }

    pub(crate) fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Decode the body of the `i`-th request, inflating it if needed.
    pub(crate) fn decode_request<M: Message + Default>(&self, i: usize) -> M {
        let request = self.requests.lock().unwrap()[i].clone();
        let body = match request.header(headers::REQUEST_COMPRESS_TYPE) {
            Some(kind) => {
                let size = request.header(headers::REQUEST_COMPRESS_SIZE).unwrap().parse().unwrap();
                Compression::from_header(kind).unwrap().decompress(&request.body, size).unwrap()
            }
            None => request.body.clone(),
        };
        M::decode(body.as_slice()).unwrap()
    }

    /// What the service checks before looking at a request.
    fn authenticate(&self, request: &WireRequest) -> Option<Reply> {
        let digest_ok = request
            .header(headers::CONTENT_DIGEST)
            .map(|d| checksum::verify(d, &request.body).is_ok())
            .unwrap_or(false);
        let expected = auth::sign_request(
            &self.credentials.access_key_secret,
            request.action,
            request.method,
            &[],
            request.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
        .ok();
        let signature_ok = expected.is_some() && request.header(headers::SIGNATURE) == expected.as_deref();
        if digest_ok && signature_ok {
            None
        } else {
            Some(Reply::service_error(403, "OTSAuthFailed", "signature mismatch"))
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: WireRequest,
        mut consumer: ResponseConsumer,
    ) -> Result<ResponseConsumer, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        tokio::task::yield_now().await;

        let step = match self.authenticate(&request) {
            Some(rejection) => Step::Reply(rejection),
            None => self
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Step::Fault(TransportError::new(TransportErrorKind::Other, "script exhausted"))),
        };
        let reply = match step {
            Step::Fault(e) => return Err(e),
            Step::Reply(reply) => reply,
        };

        let id = format!("req-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let (status, response_headers, body) = reply.render(request.action, &self.credentials, &id);
        consumer.on_status(status);
        for (k, v) in &response_headers {
            consumer.on_header(k, v);
        }
        for chunk in body.chunks(7) {
            consumer.on_body(chunk);
        }
        consumer.on_complete();
        Ok(consumer)
    }
}
