//! Core types for the spool HTTP request executor.
//!
//! This crate provides the data model shared by every layer of the pipeline:
//! - [`Request`] and [`RequestBuilder`] - HTTP request types
//! - [`CallContext`] - Per-call cancellation and deadline
//! - [`Response`] - HTTP response type
//! - [`Error`] and [`Result`] - Error handling
//! - [`StatusCodeRange`] and [`in_ranges`] - Status code classification
//! - [`HttpClient`] - Client trait implemented by the executor
//! - [`Method`] and [`header`] - Re-exported from the `http` crate

mod body;
mod client;
mod context;
mod error;
pub mod prelude;
mod request;
mod response;
mod status;

pub use body::{ContentType, from_json, to_json};
pub use client::{HttpClient, HttpClientExt};
pub use context::CallContext;
pub use error::{Error, Result};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use status::{StatusCodeRange, in_ranges};

// Re-export http crate types for methods, status codes and headers
pub use http::{Method, StatusCode, header};

// Re-export the cancellation token used by `CallContext`
pub use tokio_util::sync::CancellationToken;
