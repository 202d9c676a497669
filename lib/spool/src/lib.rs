//! Composable HTTP request executor.
//!
//! A terminal transport call wrapped by an ordered chain of Tower middleware:
//! retry with exponential backoff, response caching, status-code-as-error
//! classification, static headers and bearer auth, logging and mocking.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use spool::prelude::*;
//!
//! let executor = Executor::builder(HyperTransport::new())
//!     .with_bearer_auth("my-token")
//!     .with_retry(RetryConfig::builder().max_retries(3).retry_on(500..=599).build())
//!     .build();
//!
//! let response = executor.get("https://api.example.com/users/42").await?;
//! ```

mod config;
mod connector;
mod executor;
pub mod middleware;
pub mod prelude;
mod store;
mod transport;

pub use config::{TransportConfig, TransportConfigBuilder};
pub use executor::{BoxedService, Executor, ExecutorBuilder, ServiceFuture};
pub use store::{CacheStore, MemoryStore, StoreError};
pub use transport::HyperTransport;

// Re-export tower for middleware composition
pub use tower;
pub use url;

// Re-export core types
pub use spool_core::{
    CallContext, CancellationToken, ContentType, Error, HttpClient, HttpClientExt, Method,
    Request, RequestBuilder, Response, Result, StatusCode, StatusCodeRange, from_json, header,
    in_ranges, to_json,
};
