//! Error taxonomy for calls against the table store.
//!
//! Only [`OtsError::Transport`], [`OtsError::Service`] and
//! [`OtsError::PartialFailure`] are ever handed to a retry strategy; the
//! remaining kinds mean the response contract was broken (or the caller gave
//! up) and are never retried. A batch call that already reconciled some rows
//! reports any such ending as the `last_error` of its partial failure.

use std::fmt;

use crate::batch::{BatchGetRowResult, BatchWriteRowResult};

/// Server error codes the engine reacts to.
pub mod codes {
    pub const ROW_OPERATION_CONFLICT: &str = "OTSRowOperationConflict";
    pub const NOT_ENOUGH_CAPACITY_UNIT: &str = "OTSNotEnoughCapacityUnit";
    pub const TABLE_NOT_READY: &str = "OTSTableNotReady";
    pub const PARTITION_UNAVAILABLE: &str = "OTSPartitionUnavailable";
    pub const SERVER_BUSY: &str = "OTSServerBusy";
    pub const QUOTA_EXHAUSTED: &str = "OTSQuotaExhausted";
    pub const STORAGE_TIMEOUT: &str = "OTSTimeout";
    pub const INTERNAL_SERVER_ERROR: &str = "OTSInternalServerError";
    pub const SERVER_UNAVAILABLE: &str = "OTSServerUnavailable";
    pub const PARAMETER_INVALID: &str = "OTSParameterInvalid";
    pub const CONDITION_CHECK_FAIL: &str = "OTSConditionCheckFail";

    /// 301 with a `location` header.
    pub const MOVED_PERMANENTLY: &str = "OTSMovedPermanently";
    /// Non-2xx response whose body is not a decodable error message.
    pub const UNKNOWN_SERVER_ERROR: &str = "OTSUnknownServerError";

    /// Only this exact message makes `OTSQuotaExhausted` retryable.
    pub const TOO_FREQUENT_TABLE_OPERATIONS: &str = "Too frequent table operations.";
}

/// Structured failure returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub code: String,
    pub message: String,
    pub request_id: String,
    pub http_status: u16,
}

impl ServiceError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        request_id: impl Into<String>,
        http_status: u16,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: request_id.into(),
            http_status,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} [request id {}]",
            self.code, self.http_status, self.message, self.request_id
        )
    }
}

impl std::error::Error for ServiceError {}

/// Coarse cause of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connection,
    Other,
}

/// No structured server response reached the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TransportErrorKind::Timeout => write!(f, "timed out: {}", self.message),
            TransportErrorKind::Connection => write!(f, "connection failed: {}", self.message),
            TransportErrorKind::Other => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

/// Reconciled batch result carried by a partial failure.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Get(BatchGetRowResult),
    Write(BatchWriteRowResult),
}

/// A batch call came back with at least one failed row.
///
/// `outcome` always covers every row of the original request; `errors` is
/// the flattened list of per-row failures in table / group / index order.
/// When a later attempt failed as a whole, `outcome` is the result
/// reconciled so far and `last_error` is what ended the call.
#[derive(Debug, Clone)]
pub struct PartialFailure {
    pub outcome: BatchOutcome,
    pub errors: Vec<ServiceError>,
    pub last_error: Option<Box<OtsError>>,
}

impl PartialFailure {
    pub fn new(outcome: BatchOutcome, errors: Vec<ServiceError>) -> Self {
        Self {
            outcome,
            errors,
            last_error: None,
        }
    }

    /// Keep this reconciled outcome, ended by `error`.
    pub fn ended_by(&self, error: OtsError) -> Self {
        Self {
            outcome: self.outcome.clone(),
            errors: self.errors.clone(),
            last_error: Some(Box::new(error)),
        }
    }
}

impl fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row(s) failed", self.errors.len())?;
        if let Some(first) = self.errors.first() {
            write!(f, ", first: {}", first)?;
        }
        if let Some(last) = &self.last_error {
            write!(f, "; last attempt: {}", last)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OtsError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("service: {0}")]
    Service(#[from] ServiceError),
    #[error("partial failure: {0}")]
    PartialFailure(Box<PartialFailure>),
    #[error("decode: {0}")]
    Decode(String),
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("call cancelled")]
    Cancelled,
}

impl OtsError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        OtsError::ProtocolViolation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        OtsError::Decode(msg.into())
    }

    /// True for the kinds a retry strategy is allowed to look at.
    pub fn is_retry_candidate(&self) -> bool {
        matches!(
            self,
            OtsError::Transport(_) | OtsError::Service(_) | OtsError::PartialFailure(_)
        )
    }

    pub fn as_partial_failure(&self) -> Option<&PartialFailure> {
        match self {
            OtsError::PartialFailure(p) => Some(p),
            _ => None,
        }
    }

    /// Request id of the response that produced this error, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            OtsError::Service(e) => Some(&e.request_id),
            OtsError::PartialFailure(p) => p.errors.first().map(|e| e.request_id.as_str()),
            _ => None,
        }
    }

    /// The error that ended the call: the last attempt's failure for a batch
    /// that was reconciled before failing as a whole, otherwise `self`.
    pub fn root_cause(&self) -> &OtsError {
        match self {
            OtsError::PartialFailure(p) => p.last_error.as_deref().unwrap_or(self),
            _ => self,
        }
    }
}

impl From<PartialFailure> for OtsError {
    fn from(p: PartialFailure) -> Self {
        OtsError::PartialFailure(Box::new(p))
    }
}

impl From<prost::DecodeError> for OtsError {
    fn from(e: prost::DecodeError) -> Self {
        OtsError::Decode(e.to_string())
    }
}
