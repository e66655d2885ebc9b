//! Retry loop: issue attempts until success, a refusal, or cancellation.

use std::future::Future;

use tokio::sync::oneshot;

use crate::control::CallHandle;
use crate::error::OtsError;

use super::context::{Attempt, ExecutionContext, RetryableRequest};
use super::policy::RetryDecision;

/// Runs `reinvoke` until it succeeds or the context's strategy says to stop.
///
/// Decode errors and protocol violations are returned immediately. On a
/// retryable failure the context is updated (retry count, narrowed batch
/// request) and the next attempt is scheduled on the tokio timer after the
/// strategy's delay. Cancellation is checked right before every attempt and
/// while waiting out a delay; attempts of one call never overlap.
///
/// Once a batch attempt has partially failed, every later way of failing
/// (refusal, contract breach, cancellation) still returns a partial failure
/// with all rows reconciled so far; the failure that ended the call is its
/// `last_error`.
pub async fn run_with_retry<Req, Res, F, Fut>(
    mut ctx: ExecutionContext<Req, Res>,
    mut reinvoke: F,
) -> Result<Res, OtsError>
where
    Req: RetryableRequest,
    F: FnMut(Attempt<Req>) -> Fut,
    Fut: Future<Output = Result<Res, OtsError>>,
{
    drive(&mut ctx, &mut reinvoke).await
}

/// Like [`run_with_retry`], but runs on a spawned task and returns a handle.
/// Dropping or cancelling the handle stops any further attempt.
pub fn spawn_with_retry<Req, Res, F, Fut>(ctx: ExecutionContext<Req, Res>, mut reinvoke: F) -> CallHandle<Res>
where
    Req: RetryableRequest + 'static,
    Res: Send + 'static,
    F: FnMut(Attempt<Req>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Res, OtsError>> + Send,
{
    let (tx, rx) = oneshot::channel();
    let cancel = ctx.cancel_token().clone();
    let mut ctx = ctx.with_sink(tx);
    tokio::spawn(async move {
        let outcome = drive(&mut ctx, &mut reinvoke).await;
        ctx.resolve(outcome);
    });
    CallHandle::new(rx, cancel)
}

async fn drive<Req, Res, F, Fut>(ctx: &mut ExecutionContext<Req, Res>, reinvoke: &mut F) -> Result<Res, OtsError>
where
    Req: RetryableRequest,
    F: FnMut(Attempt<Req>) -> Fut,
    Fut: Future<Output = Result<Res, OtsError>>,
{
    loop {
        if ctx.is_cancelled() {
            tracing::debug!(
                action = ctx.action(),
                retries = ctx.attempts(),
                trace_id = ctx.trace_id(),
                "call cancelled before attempt"
            );
            return Err(ctx.settle(OtsError::Cancelled));
        }

        let error = match reinvoke(ctx.attempt()).await {
            Ok(value) => {
                if ctx.attempts() > 0 {
                    tracing::debug!(
                        action = ctx.action(),
                        retries = ctx.attempts(),
                        trace_id = ctx.trace_id(),
                        "retry succeeded"
                    );
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !error.is_retry_candidate() {
            tracing::debug!(action = ctx.action(), error = %error, "non-retryable error");
            return Err(ctx.settle(error));
        }

        let delay = match ctx.strategy().decide(ctx.action(), &error, ctx.attempts()) {
            RetryDecision::NoRetry => {
                tracing::warn!(
                    action = ctx.action(),
                    retries = ctx.attempts(),
                    trace_id = ctx.trace_id(),
                    error = %error,
                    "giving up"
                );
                return Err(ctx.settle(error));
            }
            RetryDecision::RetryAfter(delay) => delay,
        };

        tracing::debug!(
            action = ctx.action(),
            retry = ctx.attempts() + 1,
            delay_ms = delay.as_millis() as u64,
            trace_id = ctx.trace_id(),
            error = %error,
            "scheduling retry"
        );
        ctx.prepare_retry(error)?;

        let cancel = ctx.cancel_token().clone();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                tracing::debug!(action = ctx.action(), "call cancelled during backoff");
                return Err(ctx.settle(OtsError::Cancelled));
            }
        }
    }
}
