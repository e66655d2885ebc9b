//! Classify service and transport errors into retry policy error kinds.

use crate::error::{codes, OtsError, ServiceError};
use crate::protocol::action;

use super::policy::ErrorKind;

/// True for pure reads, which may be repeated blindly after a transport failure.
pub fn is_idempotent(action: &str) -> bool {
    matches!(
        action,
        action::LIST_TABLE
            | action::DESCRIBE_TABLE
            | action::GET_ROW
            | action::BATCH_GET_ROW
            | action::GET_RANGE
    )
}

/// Classify a structured service error.
pub fn classify_service_error(e: &ServiceError) -> ErrorKind {
    match e.code.as_str() {
        codes::ROW_OPERATION_CONFLICT
        | codes::NOT_ENOUGH_CAPACITY_UNIT
        | codes::TABLE_NOT_READY
        | codes::PARTITION_UNAVAILABLE
        | codes::SERVER_BUSY => ErrorKind::Throttled,
        codes::QUOTA_EXHAUSTED if e.message == codes::TOO_FREQUENT_TABLE_OPERATIONS => {
            ErrorKind::Throttled
        }
        codes::QUOTA_EXHAUSTED => ErrorKind::Other,
        codes::STORAGE_TIMEOUT | codes::INTERNAL_SERVER_ERROR | codes::SERVER_UNAVAILABLE => {
            ErrorKind::ServerFault
        }
        _ if (500..=599).contains(&e.http_status) => ErrorKind::ServerFault,
        _ => ErrorKind::Other,
    }
}

/// Classify any error. A partial failure is classified by its worst row:
/// a single `Other` row makes the whole batch `Other`. One that ended with a
/// whole-request failure also counts that failure.
pub fn classify(e: &OtsError) -> ErrorKind {
    match e {
        OtsError::Transport(_) => ErrorKind::Transport,
        OtsError::Service(se) => classify_service_error(se),
        OtsError::PartialFailure(p) => p
            .errors
            .iter()
            .map(classify_service_error)
            .chain(p.last_error.as_deref().map(classify))
            .max_by_key(|k| k.severity())
            .unwrap_or(ErrorKind::Other),
        OtsError::Decode(_) | OtsError::ProtocolViolation(_) | OtsError::Cancelled => {
            ErrorKind::Fatal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TransportError, TransportErrorKind};

    fn service(code: &str, message: &str, status: u16) -> ServiceError {
        ServiceError::new(code, message, "req", status)
    }

    #[test]
    fn reads_are_idempotent_writes_are_not() {
        for a in [
            action::LIST_TABLE,
            action::DESCRIBE_TABLE,
            action::GET_ROW,
            action::BATCH_GET_ROW,
            action::GET_RANGE,
        ] {
            assert!(is_idempotent(a), "{a}");
        }
        for a in [
            action::PUT_ROW,
            action::UPDATE_ROW,
            action::DELETE_ROW,
            action::BATCH_WRITE_ROW,
            "CreateTable",
        ] {
            assert!(!is_idempotent(a), "{a}");
        }
    }

    #[test]
    fn throttling_codes() {
        for code in [
            codes::ROW_OPERATION_CONFLICT,
            codes::NOT_ENOUGH_CAPACITY_UNIT,
            codes::TABLE_NOT_READY,
            codes::PARTITION_UNAVAILABLE,
            codes::SERVER_BUSY,
        ] {
            assert_eq!(classify_service_error(&service(code, "", 503)), ErrorKind::Throttled);
        }
    }

    #[test]
    fn quota_exhausted_depends_on_exact_message() {
        let frequent = service(codes::QUOTA_EXHAUSTED, codes::TOO_FREQUENT_TABLE_OPERATIONS, 403);
        assert_eq!(classify_service_error(&frequent), ErrorKind::Throttled);
        let other = service(codes::QUOTA_EXHAUSTED, "other", 403);
        assert_eq!(classify_service_error(&other), ErrorKind::Other);
        let padded = service(codes::QUOTA_EXHAUSTED, "Too frequent table operations", 403);
        assert_eq!(classify_service_error(&padded), ErrorKind::Other);
    }

    #[test]
    fn server_faults_by_code_or_status() {
        assert_eq!(
            classify_service_error(&service(codes::STORAGE_TIMEOUT, "", 200)),
            ErrorKind::ServerFault
        );
        assert_eq!(
            classify_service_error(&service("SomethingNew", "", 502)),
            ErrorKind::ServerFault
        );
        assert_eq!(
            classify_service_error(&service(codes::PARAMETER_INVALID, "", 400)),
            ErrorKind::Other
        );
    }

    #[test]
    fn ended_batch_counts_its_last_error() {
        use crate::batch::BatchGetRowResult;
        use crate::error::{BatchOutcome, PartialFailure};

        let failure = PartialFailure::new(
            BatchOutcome::Get(BatchGetRowResult {
                request_id: "req".into(),
                rows: Default::default(),
            }),
            vec![service(codes::SERVER_BUSY, "", 503)],
        );
        assert_eq!(classify(&failure.clone().into()), ErrorKind::Throttled);
        let ended = failure.ended_by(TransportError::new(TransportErrorKind::Timeout, "t").into());
        assert_eq!(classify(&ended.into()), ErrorKind::Transport);
    }

    #[test]
    fn contract_breaches_are_fatal() {
        assert_eq!(classify(&OtsError::decode("x")), ErrorKind::Fatal);
        assert_eq!(classify(&OtsError::protocol("x")), ErrorKind::Fatal);
        assert_eq!(
            classify(&OtsError::from(TransportError::new(TransportErrorKind::Connection, "reset"))),
            ErrorKind::Transport
        );
    }
}
