//! Prelude module for convenient imports.
//!
//! ```ignore
//! use spool_core::prelude::*;
//! ```

pub use crate::{
    CallContext, CancellationToken, ContentType, Error, HttpClient, HttpClientExt, Method,
    Request, RequestBuilder, Response, Result, StatusCodeRange, from_json, in_ranges, to_json,
};
