//! Tower middleware layers for the spool executor.
//!
//! Every layer wraps a `Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>`
//! and produces another one, so layers compose in any order. The executor builder
//! applies them outermost first: the first layer added sees the request first and
//! the result last.
//!
//! # Available Layers
//!
//! - [`RetryLayer`] - Retries retryable outcomes with exponential backoff
//! - [`CacheLayer`] - Caches responses in a [`CacheStore`] (write-through or cache-only)
//! - [`ErrorOnStatusLayer`] - Turns selected status codes into [`crate::Error::Status`]
//! - [`HeaderLayer`], [`JsonHeadersLayer`], [`BearerAuthLayer`] - Set request headers
//! - [`LoggingLayer`] - Logs requests and outcomes using `tracing`
//! - [`MockLayer`] - Answers with canned responses, never calling inward
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use spool::{Executor, HyperTransport, MemoryStore, StatusCodeRange};
//! use spool::middleware::RetryConfig;
//!
//! let executor = Executor::builder(HyperTransport::new())
//!     .with_logging()
//!     .with_error_on_status([StatusCodeRange::CLIENT_ERRORS])
//!     .with_write_through_cache(MemoryStore::new(), Duration::from_secs(60))
//!     .with_retry(RetryConfig::default())
//!     .build();
//! ```
//!
//! Raw layers are accepted through [`crate::ExecutorBuilder::layer`].

mod cache;
mod fingerprint;
mod header;
mod logging;
mod mock;
mod retry;
mod status_error;

pub use cache::{Cache, CacheLayer, CacheMode};
pub use fingerprint::Fingerprint;
pub use header::{BearerAuthLayer, HeaderLayer, JsonHeadersLayer, SetHeaders};
pub use logging::{LogLevel, Logging, LoggingLayer};
pub use mock::{Mock, MockLayer};
pub use retry::{Retry, RetryConfig, RetryConfigBuilder, RetryLayer};
pub use status_error::{ErrorOnStatus, ErrorOnStatusLayer};

pub use crate::store::{CacheStore, MemoryStore, StoreError};

// Re-export tower types for convenience
pub use tower::{Layer, ServiceBuilder};
