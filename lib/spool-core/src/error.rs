//! Error types for spool.

use bytes::Bytes;
use derive_more::{Display, Error, From};

use crate::Response;

/// Main error type for spool operations.
///
/// Transport failures ([`Error::Connection`], [`Error::Tls`], [`Error::Timeout`]) come from the
/// terminal call. [`Error::Status`] and [`Error::MaxRetries`] are produced by middleware.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// A response whose status code was classified as a failure.
    ///
    /// The response is kept so callers can still inspect headers and body.
    #[display("status code {status}: {status_text}")]
    #[from(skip)]
    Status {
        /// HTTP status code.
        status: u16,
        /// Reason phrase.
        status_text: String,
        /// The classified response.
        #[error(not(source))]
        response: Option<Box<Response<Bytes>>>,
    },

    /// The retry budget was exhausted.
    #[display("max retries reached: {source}")]
    #[from(skip)]
    MaxRetries {
        /// Total attempts performed, first attempt included.
        #[error(not(source))]
        attempts: u32,
        /// Outcome of the last attempt.
        source: Box<Error>,
    },

    /// The call context was cancelled.
    #[display("call cancelled")]
    #[from(skip)]
    Cancelled,

    /// The call context deadline passed.
    #[display("deadline exceeded")]
    #[from(skip)]
    DeadlineExceeded,

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// Malformed response body, with path context and the raw bytes.
    #[display("parse error at '{path}': {message}")]
    #[from(skip)]
    Parse {
        /// JSON path to the error (e.g., "data.items[0].id").
        path: String,
        /// Error message.
        message: String,
        /// Raw body that failed to parse.
        #[error(not(source))]
        raw: Bytes,
    },
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a status error without an attached response.
    #[must_use]
    pub fn status_code(status: u16, status_text: impl Into<String>) -> Self {
        Self::Status {
            status,
            status_text: status_text.into(),
            response: None,
        }
    }

    /// Create a status error from the response that triggered it.
    #[must_use]
    pub fn from_response(response: Response<Bytes>) -> Self {
        Self::Status {
            status: response.status(),
            status_text: response.status_text().to_string(),
            response: Some(Box::new(response)),
        }
    }

    /// Wrap the outcome of the last attempt once retries are exhausted.
    #[must_use]
    pub fn max_retries(attempts: u32, last: Self) -> Self {
        Self::MaxRetries {
            attempts,
            source: Box::new(last),
        }
    }

    /// Create a parse error.
    #[must_use]
    pub fn parse(path: impl Into<String>, message: impl Into<String>, raw: Bytes) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
            raw,
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the transport could not complete the round trip.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Tls(_) | Self::Timeout)
    }

    /// Returns `true` if the call context fired (cancellation or deadline).
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Returns `true` if the retry budget was exhausted.
    #[must_use]
    pub const fn is_max_retries(&self) -> bool {
        matches!(self, Self::MaxRetries { .. })
    }

    /// The innermost error, looking through [`Error::MaxRetries`].
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::MaxRetries { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns the status code of a status error, wrapped or not.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a 404 Not Found status error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The response attached to a status error, wrapped or not.
    #[must_use]
    pub fn response(&self) -> Option<&Response<Bytes>> {
        match self.root() {
            Self::Status { response, .. } => response.as_deref(),
            _ => None,
        }
    }

    /// Consume the error and take the attached response, if any.
    #[must_use]
    pub fn into_response(self) -> Option<Response<Bytes>> {
        match self {
            Self::MaxRetries { source, .. } => source.into_response(),
            Self::Status { response, .. } => response.map(|r| *r),
            _ => None,
        }
    }

    /// Raw body of a parse error.
    #[must_use]
    pub fn raw(&self) -> Option<&Bytes> {
        match self {
            Self::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
