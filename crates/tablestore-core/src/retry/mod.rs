//! Retry and backoff policy.
//!
//! Error classification against the service's error taxonomy, the
//! pluggable [`RetryStrategy`], per-call [`ExecutionContext`] and the retry
//! loop that ties them together. Strategies are immutable and shared across
//! calls; contexts belong to exactly one call.

mod classify;
mod context;
mod policy;
mod run;

pub use classify::{classify, classify_service_error, is_idempotent};
pub use context::{Attempt, ExecutionContext, RetryableRequest};
pub use policy::{
    exponential_delay, AlwaysRetryStrategy, DefaultRetryStrategy, ErrorKind, RetryDecision,
    RetryStrategy,
};
pub use run::{run_with_retry, spawn_with_retry};
