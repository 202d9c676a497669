//! Prelude module for convenient imports.
//!
//! ```ignore
//! use spool::prelude::*;
//! ```

pub use crate::middleware::{CacheMode, RetryConfig};
pub use crate::{
    CacheStore, CallContext, CancellationToken, Error, Executor, ExecutorBuilder, HttpClient,
    HttpClientExt, HyperTransport, MemoryStore, Method, Request, RequestBuilder, Response, Result,
    StatusCodeRange,
};
