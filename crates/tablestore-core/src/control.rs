//! Caller-side control of a spawned call: await the outcome or cancel it.
//!
//! A spawned call owns its [`ExecutionContext`](crate::retry::ExecutionContext)
//! on a tokio task. The handle keeps the receiving end of the result sink and
//! the call's cancellation token. Cancelling (or dropping the handle) stops
//! any retry that has not fired yet; an attempt already in flight finishes,
//! but its outcome is discarded.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::OtsError;

#[derive(Debug)]
pub struct CallHandle<T> {
    rx: oneshot::Receiver<Result<T, OtsError>>,
    cancel: CancellationToken,
}

impl<T> CallHandle<T> {
    pub(crate) fn new(rx: oneshot::Receiver<Result<T, OtsError>>, cancel: CancellationToken) -> Self {
        Self { rx, cancel }
    }

    /// Request cancellation. The handle still resolves, with
    /// [`OtsError::Cancelled`] as the root cause unless the call had already
    /// finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token shared with the running call, e.g. to cancel it from elsewhere.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl<T> Future for CallHandle<T> {
    type Output = Result<T, OtsError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // Task ended without resolving (runtime shutdown or panic).
            Poll::Ready(Err(_)) => Poll::Ready(Err(OtsError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for CallHandle<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
