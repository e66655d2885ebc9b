//! Per-attempt response consumer.
//!
//! The transport feeds the consumer as bytes arrive: a status line, header
//! lines, body chunks, then completion. Once the body is complete,
//! [`ResponseConsumer::finish`] runs the validation chain, decodes the
//! message and hands it to the operation's `parse_result`.
//!
//! Events that arrive out of order poison the consumer; the first such
//! problem is reported by `finish` as a protocol violation.

mod handlers;

pub use handlers::{
    ChecksumHandler, DecompressHandler, FreshnessHandler, RawResponse, ResponseHandler,
    ServerErrorHandler, ValidationChain,
};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{OtsError, PartialFailure};
use crate::ops::{Operation, ParseContext};
use crate::protocol::{decode, headers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    AwaitHeaders,
    AwaitBody,
    BodyComplete,
    Done,
}

#[derive(Debug)]
pub struct ResponseConsumer {
    action: &'static str,
    state: ConsumerState,
    status: Option<u16>,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
    fault: Option<String>,
    chain: Arc<ValidationChain>,
}

impl ResponseConsumer {
    pub fn new(action: &'static str, chain: Arc<ValidationChain>) -> Self {
        Self {
            action,
            state: ConsumerState::AwaitHeaders,
            status: None,
            headers: BTreeMap::new(),
            body: Vec::new(),
            fault: None,
            chain,
        }
    }

    pub fn action(&self) -> &'static str {
        self.action
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    fn poison(&mut self, why: String) {
        if self.fault.is_none() {
            self.fault = Some(why);
        }
    }

    /// A new status line. Interim responses (100 Continue, redirects the
    /// transport follows) are replaced by the next status line.
    pub fn on_status(&mut self, status: u16) {
        match self.state {
            ConsumerState::AwaitHeaders | ConsumerState::AwaitBody if self.body.is_empty() => {
                self.status = Some(status);
                self.headers.clear();
                self.state = ConsumerState::AwaitHeaders;
            }
            state => self.poison(format!("status line in state {:?}", state)),
        }
    }

    pub fn on_header(&mut self, name: &str, value: &str) {
        if self.state != ConsumerState::AwaitHeaders || self.status.is_none() {
            self.poison(format!("header {} in state {:?}", name, self.state));
            return;
        }
        self.headers
            .insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    pub fn on_body(&mut self, chunk: &[u8]) {
        match self.state {
            ConsumerState::AwaitHeaders if self.status.is_some() => {
                self.state = ConsumerState::AwaitBody;
                self.body.extend_from_slice(chunk);
            }
            ConsumerState::AwaitBody => self.body.extend_from_slice(chunk),
            state => self.poison(format!("body chunk in state {:?}", state)),
        }
    }

    pub fn on_complete(&mut self) {
        match self.state {
            ConsumerState::AwaitHeaders | ConsumerState::AwaitBody if self.status.is_some() => {
                self.state = ConsumerState::BodyComplete;
            }
            state => self.poison(format!("completion in state {:?}", state)),
        }
    }

    /// Validate, decode and parse the completed response. Resolves once;
    /// a second call is a protocol violation.
    pub fn finish<Op: Operation>(
        &mut self,
        request: &Op::Request,
        previous: Option<&PartialFailure>,
    ) -> Result<Op::Output, OtsError> {
        let state = std::mem::replace(&mut self.state, ConsumerState::Done);
        if let Some(fault) = self.fault.take() {
            return Err(OtsError::protocol(format!("{}: {}", self.action, fault)));
        }
        let status = match (state, self.status) {
            (ConsumerState::BodyComplete, Some(status)) => status,
            (state, _) => {
                return Err(OtsError::protocol(format!(
                    "{}: response finished in state {:?}",
                    self.action, state
                )))
            }
        };

        let mut raw = RawResponse {
            action: self.action,
            status,
            headers: std::mem::take(&mut self.headers),
            body: std::mem::take(&mut self.body),
        };
        self.chain.validate(&mut raw)?;

        let request_id = raw.require_header(headers::REQUEST_ID)?.to_string();
        let message = decode::<Op::Response>(&raw.body)?;
        Op::parse_result(
            message,
            ParseContext {
                request,
                request_id: &request_id,
                http_status: status,
                previous,
            },
        )
    }
}
