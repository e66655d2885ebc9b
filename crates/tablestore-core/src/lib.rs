//! Client-side execution engine for the Tablestore wire protocol: issues
//! calls, retries them under a pluggable policy, validates responses and
//! reconciles partially failed batch operations into one result.

pub mod config;
pub mod logging;

pub mod auth;
pub mod batch;
pub mod checksum;
pub mod client;
pub mod compression;
pub mod consumer;
pub mod control;
pub mod error;
pub mod model;
pub mod ops;
pub mod protocol;
pub mod retry;
pub mod transport;

pub use batch::{BatchGetRowResult, BatchResult, BatchWriteRowResult, ReadRow, RowGroup, RowStatus};
pub use client::{CallOptions, TablestoreClient};
pub use config::ClientConfig;
pub use control::CallHandle;
pub use error::{OtsError, PartialFailure, ServiceError, TransportError};
pub use retry::{AlwaysRetryStrategy, DefaultRetryStrategy, RetryStrategy};
