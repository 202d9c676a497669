//! Status code classification middleware.
//!
//! Converts responses whose status falls in any configured range into
//! [`Error::Status`]. The response stays attached to the error, so callers can still
//! inspect its headers and body.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower::{Layer, Service};
use tracing::debug;

use crate::{Error, Request, Response, Result, StatusCodeRange, in_ranges};

/// Layer that turns selected status codes into errors.
///
/// # Example
///
/// ```ignore
/// use spool::StatusCodeRange;
/// use spool::middleware::ErrorOnStatusLayer;
///
/// let layer = ErrorOnStatusLayer::new([StatusCodeRange::new(400, 499)]);
/// ```
#[derive(Debug, Clone)]
pub struct ErrorOnStatusLayer {
    ranges: Arc<[StatusCodeRange]>,
}

impl ErrorOnStatusLayer {
    /// Create a layer erroring on any status in `ranges`.
    pub fn new(ranges: impl IntoIterator<Item = StatusCodeRange>) -> Self {
        Self {
            ranges: ranges.into_iter().collect(),
        }
    }

    /// The configured ranges.
    #[must_use]
    pub fn ranges(&self) -> &[StatusCodeRange] {
        &self.ranges
    }
}

impl Default for ErrorOnStatusLayer {
    fn default() -> Self {
        Self::new([StatusCodeRange::NON_2XX])
    }
}

impl<S> Layer<S> for ErrorOnStatusLayer {
    type Service = ErrorOnStatus<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorOnStatus {
            inner,
            ranges: Arc::clone(&self.ranges),
        }
    }
}

/// Service that turns selected status codes of the inner service into errors.
#[derive(Debug, Clone)]
pub struct ErrorOnStatus<S> {
    inner: S,
    ranges: Arc<[StatusCodeRange]>,
}

impl<S> Service<Request<Bytes>> for ErrorOnStatus<S>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let ranges = Arc::clone(&self.ranges);
        let future = self.inner.call(request);

        Box::pin(async move {
            let response = future.await?;
            if in_ranges(response.status(), &ranges) {
                debug!(status = response.status(), "status classified as error");
                return Err(Error::from_response(response));
            }
            Ok(response)
        })
    }
}
