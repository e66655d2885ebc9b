//! Async client: one entry point per operation, all running through the
//! same retry loop.
//!
//! Every call gets its own [`ExecutionContext`]; the retry strategy, the
//! validation chain and the transport are shared by all calls of a client.

mod request;

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::Credentials;
use crate::batch::{BatchGetRowResult, BatchWriteRowResult};
use crate::compression::Compression;
use crate::config::ClientConfig;
use crate::consumer::{ResponseConsumer, ValidationChain};
use crate::control::CallHandle;
use crate::error::OtsError;
use crate::model::{
    BatchGetRowRequest, BatchWriteRowRequest, GetRowRequest, GetRowResult, ListTableRequest,
    ListTableResult, PutRowRequest, PutRowResult,
};
use crate::ops::{BatchGetRow, BatchWriteRow, GetRow, ListTable, Operation, PutRow};
use crate::retry::{run_with_retry, spawn_with_retry, Attempt, ExecutionContext, RetryStrategy};
use crate::transport::{CurlTransport, Transport};

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Use this strategy instead of the client's.
    pub retry_strategy: Option<Arc<dyn RetryStrategy>>,
    /// Cancelling this token stops any retry that has not fired yet.
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    pub fn with_retry_strategy(mut self, strategy: Arc<dyn RetryStrategy>) -> Self {
        self.retry_strategy = Some(strategy);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

pub(crate) struct ClientInner<T> {
    pub(crate) endpoint: Url,
    pub(crate) instance_name: String,
    pub(crate) credentials: Credentials,
    pub(crate) compression: Option<Compression>,
    strategy: Arc<dyn RetryStrategy>,
    validation: Arc<ValidationChain>,
    transport: T,
}

impl<T: Transport> ClientInner<T> {
    async fn attempt<Op: Operation>(
        self: Arc<Self>,
        attempt: Attempt<Op::Request>,
    ) -> Result<Op::Output, OtsError> {
        let wire = request::build::<Op, T>(&self, &attempt.request, &attempt.trace_id)?;
        tracing::trace!(
            action = Op::ACTION,
            retries = attempt.retries,
            bytes = wire.body.len(),
            "sending request"
        );
        let consumer = ResponseConsumer::new(Op::ACTION, Arc::clone(&self.validation));
        let mut consumer = self.transport.send(wire, consumer).await?;
        consumer.finish::<Op>(&attempt.request, attempt.previous.as_deref())
    }
}

pub struct TablestoreClient<T = CurlTransport> {
    inner: Arc<ClientInner<T>>,
}

impl<T> Clone for TablestoreClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for TablestoreClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TablestoreClient")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("instance_name", &self.inner.instance_name)
            .field("strategy", &self.inner.strategy)
            .finish()
    }
}

impl TablestoreClient<CurlTransport> {
    /// Client over libcurl, with timeouts taken from `config`.
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let transport = CurlTransport::new(config.connect_timeout(), config.request_timeout());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> TablestoreClient<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> anyhow::Result<Self> {
        config.validate()?;
        let credentials = config.credentials();
        let validation = ValidationChain::standard(credentials.clone(), config.response_freshness());
        Ok(Self {
            inner: Arc::new(ClientInner {
                endpoint: config.endpoint_url()?,
                instance_name: config.instance_name.clone(),
                credentials,
                compression: config.request_compression,
                strategy: config.retry_strategy(),
                validation: Arc::new(validation),
                transport,
            }),
        })
    }

    pub fn retry_strategy(&self) -> &Arc<dyn RetryStrategy> {
        &self.inner.strategy
    }

    fn context<Op: Operation>(
        &self,
        request: Op::Request,
        options: CallOptions,
    ) -> ExecutionContext<Op::Request, Op::Output> {
        let strategy = options
            .retry_strategy
            .unwrap_or_else(|| Arc::clone(&self.inner.strategy));
        // A child token: the call may cancel itself without touching the caller's token.
        let cancel = options
            .cancel
            .map(|t| t.child_token())
            .unwrap_or_default();
        let ctx = ExecutionContext::new(Op::ACTION, request, strategy, cancel);
        tracing::debug!(action = Op::ACTION, trace_id = ctx.trace_id(), "call started");
        ctx
    }

    /// Run `Op` to completion on the current task.
    pub async fn call<Op: Operation>(
        &self,
        request: Op::Request,
        options: CallOptions,
    ) -> Result<Op::Output, OtsError> {
        let ctx = self.context::<Op>(request, options);
        let inner = Arc::clone(&self.inner);
        run_with_retry(ctx, move |attempt| Arc::clone(&inner).attempt::<Op>(attempt)).await
    }

    /// Run `Op` on a spawned task; the handle resolves to its outcome.
    pub fn spawn<Op: Operation>(&self, request: Op::Request, options: CallOptions) -> CallHandle<Op::Output> {
        let ctx = self.context::<Op>(request, options);
        let inner = Arc::clone(&self.inner);
        spawn_with_retry(ctx, move |attempt| Arc::clone(&inner).attempt::<Op>(attempt))
    }

    pub async fn list_table(&self) -> Result<ListTableResult, OtsError> {
        self.call::<ListTable>(ListTableRequest, CallOptions::default()).await
    }

    pub async fn get_row(&self, request: GetRowRequest) -> Result<GetRowResult, OtsError> {
        self.call::<GetRow>(request, CallOptions::default()).await
    }

    pub async fn put_row(&self, request: PutRowRequest) -> Result<PutRowResult, OtsError> {
        self.call::<PutRow>(request, CallOptions::default()).await
    }

    /// On failure the error is a partial failure carrying every row's final
    /// status whenever at least one response was reconciled, even if a later
    /// attempt failed as a whole. [`OtsError::root_cause`] gives the failure
    /// that ended the call.
    pub async fn batch_get_row(&self, request: BatchGetRowRequest) -> Result<BatchGetRowResult, OtsError> {
        self.call::<BatchGetRow>(request, CallOptions::default()).await
    }

    /// Same failure reporting as [`batch_get_row`](Self::batch_get_row), per row group.
    pub async fn batch_write_row(
        &self,
        request: BatchWriteRowRequest,
    ) -> Result<BatchWriteRowResult, OtsError> {
        self.call::<BatchWriteRow>(request, CallOptions::default()).await
    }

    pub fn spawn_get_row(&self, request: GetRowRequest, options: CallOptions) -> CallHandle<GetRowResult> {
        self.spawn::<GetRow>(request, options)
    }

    pub fn spawn_put_row(&self, request: PutRowRequest, options: CallOptions) -> CallHandle<PutRowResult> {
        self.spawn::<PutRow>(request, options)
    }

    pub fn spawn_batch_get_row(
        &self,
        request: BatchGetRowRequest,
        options: CallOptions,
    ) -> CallHandle<BatchGetRowResult> {
        self.spawn::<BatchGetRow>(request, options)
    }

    pub fn spawn_batch_write_row(
        &self,
        request: BatchWriteRowRequest,
        options: CallOptions,
    ) -> CallHandle<BatchWriteRowResult> {
        self.spawn::<BatchWriteRow>(request, options)
    }
}
