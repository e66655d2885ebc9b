//! Per-call mutable state carried across attempts.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::{OtsError, PartialFailure};

use super::policy::RetryStrategy;

/// A request that can be rebuilt for the next attempt.
pub trait RetryableRequest: Clone + Send + Sync {
    /// Request for the attempt after `failure`, built from the original
    /// request. Single-row requests are re-sent unchanged.
    fn narrow(&self, _failure: &PartialFailure) -> Result<Self, OtsError> {
        Ok(self.clone())
    }
}

/// What one attempt gets to see.
#[derive(Debug)]
pub struct Attempt<Req> {
    pub request: Arc<Req>,
    /// Accumulated batch result from the previous attempt, if it partially failed.
    pub previous: Option<Arc<PartialFailure>>,
    /// Retries performed before this attempt.
    pub retries: u32,
    pub trace_id: Arc<str>,
}

/// State of one logical call: created once, mutated only by the retry
/// driver between attempts, resolved exactly once.
pub struct ExecutionContext<Req, Res> {
    action: &'static str,
    original: Arc<Req>,
    current: Arc<Req>,
    attempts: u32,
    previous: Option<Arc<PartialFailure>>,
    strategy: Arc<dyn RetryStrategy>,
    cancel: CancellationToken,
    trace_id: Arc<str>,
    sink: Option<oneshot::Sender<Result<Res, OtsError>>>,
}

impl<Req: RetryableRequest, Res> ExecutionContext<Req, Res> {
    pub fn new(
        action: &'static str,
        request: Req,
        strategy: Arc<dyn RetryStrategy>,
        cancel: CancellationToken,
    ) -> Self {
        let original = Arc::new(request);
        Self {
            action,
            current: Arc::clone(&original),
            original,
            attempts: 0,
            previous: None,
            strategy,
            cancel,
            trace_id: Arc::from(uuid::Uuid::new_v4().to_string()),
            sink: None,
        }
    }

    /// Deliver the final outcome through `sink`. Only spawned calls carry a
    /// sink; [`run_with_retry`](super::run_with_retry) returns its outcome directly.
    pub(crate) fn with_sink(mut self, sink: oneshot::Sender<Result<Res, OtsError>>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn action(&self) -> &'static str {
        self.action
    }

    pub fn original_request(&self) -> &Req {
        &self.original
    }

    pub fn current_request(&self) -> &Req {
        &self.current
    }

    /// Retries performed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn previous_failure(&self) -> Option<&PartialFailure> {
        self.previous.as_deref()
    }

    pub fn strategy(&self) -> &dyn RetryStrategy {
        self.strategy.as_ref()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub(crate) fn attempt(&self) -> Attempt<Req> {
        Attempt {
            request: Arc::clone(&self.current),
            previous: self.previous.clone(),
            retries: self.attempts,
            trace_id: Arc::clone(&self.trace_id),
        }
    }

    /// Record a retryable failure: bump the retry count and, for a partial
    /// batch failure, narrow the next request to the failed rows.
    pub(crate) fn prepare_retry(&mut self, error: OtsError) -> Result<(), OtsError> {
        if let OtsError::PartialFailure(failure) = error {
            let narrowed = match self.original.narrow(&failure) {
                Ok(request) => request,
                Err(e) => return Err(failure.ended_by(e).into()),
            };
            self.current = Arc::new(narrowed);
            self.previous = Some(Arc::new(*failure));
        }
        self.attempts += 1;
        Ok(())
    }

    /// The error a call ends with. Once a batch has been partly reconciled,
    /// the caller gets that outcome back with `error` as its last error.
    pub(crate) fn settle(&self, error: OtsError) -> OtsError {
        match (&self.previous, error) {
            (_, e @ OtsError::PartialFailure(_)) => e,
            (Some(previous), e) => previous.ended_by(e).into(),
            (None, e) => e,
        }
    }

    /// Hand the outcome to the attached sink.
    pub(crate) fn resolve(mut self, outcome: Result<Res, OtsError>) {
        match self.sink.take() {
            Some(sink) => {
                if sink.send(outcome).is_err() {
                    tracing::debug!(action = self.action, "caller dropped the call before it resolved");
                }
            }
            None => tracing::debug!(action = self.action, "no sink attached, outcome dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchGetRowResult, BatchResult, RowStatus};
    use crate::error::{codes, BatchOutcome, ServiceError};
    use crate::model::{BatchGetRowRequest, PrimaryKey};
    use crate::protocol::action;
    use crate::retry::DefaultRetryStrategy;

    fn context(req: BatchGetRowRequest) -> ExecutionContext<BatchGetRowRequest, ()> {
        ExecutionContext::new(
            action::BATCH_GET_ROW,
            req,
            Arc::new(DefaultRetryStrategy::default()),
            CancellationToken::new(),
        )
    }

    #[test]
    fn partial_failure_narrows_from_original_request() {
        let mut req = BatchGetRowRequest::new();
        for id in 0..4 {
            req.add("t", PrimaryKey::new().integer("id", id));
        }
        let mut ctx = context(req);
        let busy = ServiceError::new(codes::SERVER_BUSY, "", "r", 200);

        let mut rows = BatchResult::default();
        for i in 0..4 {
            rows.push_row(if i == 2 {
                RowStatus::failed("t", i, busy.clone())
            } else {
                RowStatus::succeeded("t", i, Default::default())
            });
        }
        let failure = PartialFailure {
            outcome: BatchOutcome::Get(BatchGetRowResult {
                request_id: "r".into(),
                rows,
            }),
            errors: vec![busy],
            last_error: None,
        };
        ctx.prepare_retry(failure.into()).unwrap();

        assert_eq!(ctx.attempts(), 1);
        assert_eq!(
            ctx.current_request().tables["t"].primary_keys,
            vec![PrimaryKey::new().integer("id", 2)]
        );
        assert_eq!(ctx.original_request().row_count(), 4);
        assert!(ctx.previous_failure().is_some());
        assert_eq!(ctx.attempt().retries, 1);
    }

    #[test]
    fn plain_failure_keeps_request() {
        let mut req = BatchGetRowRequest::new();
        req.add("t", PrimaryKey::new().integer("id", 1));
        let mut ctx = context(req.clone());
        ctx.prepare_retry(OtsError::from(ServiceError::new(codes::SERVER_BUSY, "", "r", 503)))
            .unwrap();
        assert_eq!(ctx.current_request(), &req);
        assert!(ctx.previous_failure().is_none());
    }

    #[tokio::test]
    async fn resolve_sends_to_attached_sink() {
        let (tx, rx) = oneshot::channel();
        let ctx = context(BatchGetRowRequest::new()).with_sink(tx);
        ctx.resolve(Ok(()));
        assert!(rx.await.unwrap().is_ok());
    }

    #[test]
    fn settle_keeps_reconciled_rows_after_partial_failure() {
        let mut req = BatchGetRowRequest::new();
        for id in 0..2 {
            req.add("t", PrimaryKey::new().integer("id", id));
        }
        let mut ctx = context(req);
        let bare = || OtsError::from(ServiceError::new(codes::PARAMETER_INVALID, "bad", "r2", 400));
        assert!(matches!(ctx.settle(bare()), OtsError::Service(_)));

        let busy = ServiceError::new(codes::SERVER_BUSY, "", "r1", 200);
        let mut rows = BatchResult::default();
        rows.push_row(RowStatus::succeeded("t", 0, Default::default()));
        rows.push_row(RowStatus::failed("t", 1, busy.clone()));
        let failure = PartialFailure::new(
            BatchOutcome::Get(BatchGetRowResult {
                request_id: "r1".into(),
                rows,
            }),
            vec![busy],
        );
        ctx.prepare_retry(failure.into()).unwrap();

        let settled = ctx.settle(bare());
        let failure = settled.as_partial_failure().unwrap();
        let BatchOutcome::Get(result) = &failure.outcome else {
            panic!("expected a read outcome");
        };
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows.failed_indices("t"), vec![1]);
        match settled.root_cause() {
            OtsError::Service(e) => assert_eq!(e.code, codes::PARAMETER_INVALID),
            other => panic!("unexpected {other:?}"),
        }
    }
}
