use std::fmt;
use std::time::Duration;

use crate::error::OtsError;

use super::classify::{classify, is_idempotent};

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server-side contention or throttling; retried regardless of idempotency.
    Throttled,
    /// Server-side fault (storage timeout, internal error, 5xx); retried only
    /// for idempotent actions.
    ServerFault,
    /// No structured response reached the client; retried only for idempotent actions.
    Transport,
    /// Any other service error (not retried).
    Other,
    /// Broken response contract or cancellation; never handed to a strategy.
    Fatal,
}

impl ErrorKind {
    /// Ordering used to pick the decisive kind among several row errors.
    pub(crate) fn severity(self) -> u8 {
        match self {
            ErrorKind::Throttled => 0,
            ErrorKind::ServerFault => 1,
            ErrorKind::Transport => 2,
            ErrorKind::Other => 3,
            ErrorKind::Fatal => 4,
        }
    }
}

/// Decision returned by a retry strategy. Computed fresh on every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Decides whether and when a failed call is re-issued.
///
/// `attempts` is the number of retries already performed for the call
/// (0 after the first failure). Implementations must be pure: the same
/// inputs always give the same answer.
pub trait RetryStrategy: Send + Sync + fmt::Debug {
    fn should_retry(&self, action: &str, error: &OtsError, attempts: u32) -> bool;

    fn pause_delay(&self, action: &str, error: &OtsError, attempts: u32) -> Duration;

    fn decide(&self, action: &str, error: &OtsError, attempts: u32) -> RetryDecision {
        if self.should_retry(action, error, attempts) {
            RetryDecision::RetryAfter(self.pause_delay(action, error, attempts))
        } else {
            RetryDecision::NoRetry
        }
    }
}

/// `min(2^attempts * base, max)`, saturating. No jitter; wrap the strategy
/// if callers need it.
pub fn exponential_delay(base: Duration, max: Duration, attempts: u32) -> Duration {
    let factor = 1u32.checked_shl(attempts).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(max)
}

/// Retry policy driven by the server error taxonomy.
#[derive(Debug, Clone, Copy)]
pub struct DefaultRetryStrategy {
    /// Retries allowed after the first attempt.
    pub max_retry_times: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for DefaultRetryStrategy {
    fn default() -> Self {
        Self {
            max_retry_times: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryStrategy for DefaultRetryStrategy {
    fn should_retry(&self, action: &str, error: &OtsError, attempts: u32) -> bool {
        if attempts > self.max_retry_times {
            return false;
        }
        match classify(error) {
            ErrorKind::Throttled => true,
            ErrorKind::ServerFault | ErrorKind::Transport => is_idempotent(action),
            ErrorKind::Other | ErrorKind::Fatal => false,
        }
    }

    fn pause_delay(&self, _action: &str, _error: &OtsError, attempts: u32) -> Duration {
        exponential_delay(self.base_delay, self.max_delay, attempts)
    }
}

/// Retries every retry-candidate error up to a ceiling, ignoring its
/// classification. Same backoff as [`DefaultRetryStrategy`].
#[derive(Debug, Clone, Copy)]
pub struct AlwaysRetryStrategy {
    pub max_retry_times: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for AlwaysRetryStrategy {
    fn default() -> Self {
        let d = DefaultRetryStrategy::default();
        Self {
            max_retry_times: d.max_retry_times,
            base_delay: d.base_delay,
            max_delay: d.max_delay,
        }
    }
}

impl RetryStrategy for AlwaysRetryStrategy {
    fn should_retry(&self, _action: &str, error: &OtsError, attempts: u32) -> bool {
        attempts <= self.max_retry_times && error.is_retry_candidate()
    }

    fn pause_delay(&self, _action: &str, _error: &OtsError, attempts: u32) -> Duration {
        exponential_delay(self.base_delay, self.max_delay, attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchGetRowResult, BatchResult, RowStatus};
    use crate::error::{
        codes, BatchOutcome, PartialFailure, ServiceError, TransportError, TransportErrorKind,
    };
    use crate::protocol::action;

    fn service(code: &str, message: &str) -> OtsError {
        OtsError::from(ServiceError::new(code, message, "req", 503))
    }

    fn transport() -> OtsError {
        OtsError::from(TransportError::new(TransportErrorKind::Connection, "reset"))
    }

    fn partial(errors: Vec<ServiceError>) -> OtsError {
        let mut rows = BatchResult::default();
        for (i, e) in errors.iter().enumerate() {
            rows.push_row(RowStatus::failed("t", i, e.clone()));
        }
        OtsError::from(PartialFailure {
            outcome: BatchOutcome::Get(BatchGetRowResult {
                request_id: "req".into(),
                rows,
            }),
            errors,
            last_error: None,
        })
    }

    fn strategy() -> DefaultRetryStrategy {
        DefaultRetryStrategy {
            max_retry_times: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(1000),
        }
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let p = strategy();
        let e = transport();
        assert_eq!(p.pause_delay(action::GET_ROW, &e, 0), Duration::from_millis(50));
        assert_eq!(p.pause_delay(action::GET_ROW, &e, 3), Duration::from_millis(400));
        assert_eq!(p.pause_delay(action::GET_ROW, &e, 20), Duration::from_millis(1000));
        assert_eq!(p.pause_delay(action::GET_ROW, &e, 40), Duration::from_millis(1000));
    }

    #[test]
    fn transport_errors_retry_only_idempotent_actions() {
        let p = strategy();
        let e = transport();
        for a in [
            action::LIST_TABLE,
            action::DESCRIBE_TABLE,
            action::GET_ROW,
            action::BATCH_GET_ROW,
            action::GET_RANGE,
        ] {
            assert!(p.should_retry(a, &e, 1), "{a}");
        }
        for a in [action::PUT_ROW, action::UPDATE_ROW, action::DELETE_ROW, action::BATCH_WRITE_ROW] {
            assert!(!p.should_retry(a, &e, 1), "{a}");
        }
    }

    #[test]
    fn conflict_retries_even_for_non_idempotent_put() {
        let p = strategy();
        assert!(p.should_retry(action::PUT_ROW, &service(codes::ROW_OPERATION_CONFLICT, ""), 1));
    }

    #[test]
    fn quota_exhausted_only_for_too_frequent_table_operations() {
        let p = strategy();
        let frequent = service(codes::QUOTA_EXHAUSTED, codes::TOO_FREQUENT_TABLE_OPERATIONS);
        let other = service(codes::QUOTA_EXHAUSTED, "other");
        for a in [action::GET_ROW, action::PUT_ROW, "CreateTable"] {
            assert!(p.should_retry(a, &frequent, 1));
            assert!(!p.should_retry(a, &other, 1));
        }
    }

    #[test]
    fn server_faults_need_idempotency() {
        let p = strategy();
        let e = service(codes::INTERNAL_SERVER_ERROR, "");
        assert!(p.should_retry(action::GET_ROW, &e, 0));
        assert!(!p.should_retry(action::PUT_ROW, &e, 0));
    }

    #[test]
    fn ceiling_refuses_regardless_of_classification() {
        let p = strategy();
        assert!(p.should_retry(action::GET_ROW, &transport(), p.max_retry_times));
        assert!(!p.should_retry(action::GET_ROW, &transport(), p.max_retry_times + 1));
        assert!(!p.should_retry(
            action::GET_ROW,
            &service(codes::SERVER_BUSY, ""),
            p.max_retry_times + 1
        ));
    }

    #[test]
    fn one_non_retryable_row_vetoes_batch_retry() {
        let p = strategy();
        let busy = ServiceError::new(codes::SERVER_BUSY, "", "req", 200);
        let invalid = ServiceError::new(codes::PARAMETER_INVALID, "", "req", 200);
        assert!(p.should_retry(action::BATCH_WRITE_ROW, &partial(vec![busy.clone(), busy.clone()]), 0));
        assert!(!p.should_retry(action::BATCH_GET_ROW, &partial(vec![busy, invalid]), 0));
    }

    #[test]
    fn batch_row_server_faults_follow_action_idempotency() {
        let p = strategy();
        let timeout = ServiceError::new(codes::STORAGE_TIMEOUT, "", "req", 200);
        assert!(p.should_retry(action::BATCH_GET_ROW, &partial(vec![timeout.clone()]), 0));
        assert!(!p.should_retry(action::BATCH_WRITE_ROW, &partial(vec![timeout]), 0));
    }

    #[test]
    fn contract_breaches_never_retry() {
        let p = strategy();
        assert!(!p.should_retry(action::GET_ROW, &OtsError::decode("x"), 0));
        assert!(!p.should_retry(action::GET_ROW, &OtsError::protocol("x"), 0));
    }

    #[test]
    fn decide_combines_eligibility_and_delay() {
        let p = strategy();
        assert_eq!(
            p.decide(action::GET_ROW, &transport(), 2),
            RetryDecision::RetryAfter(Duration::from_millis(200))
        );
        assert_eq!(
            p.decide(action::PUT_ROW, &transport(), 2),
            RetryDecision::NoRetry
        );
    }

    #[test]
    fn always_retry_ignores_classification_but_not_ceiling() {
        let p = AlwaysRetryStrategy {
            max_retry_times: 2,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(1000),
        };
        let invalid = service(codes::PARAMETER_INVALID, "");
        assert!(p.should_retry(action::PUT_ROW, &invalid, 2));
        assert!(!p.should_retry(action::PUT_ROW, &invalid, 3));
        assert!(!p.should_retry(action::GET_ROW, &OtsError::decode("x"), 0));
        assert_eq!(p.pause_delay(action::PUT_ROW, &invalid, 3), Duration::from_millis(400));
    }
}
