//! Canned-response middleware for tests.
//!
//! A mock layer short-circuits the chain: nothing inward of it (including the
//! transport) is ever called.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower::{Layer, Service};

use crate::{Error, Request, Response, Result};

type MockFn = Arc<dyn Fn(&Request<Bytes>) -> Result<Response<Bytes>> + Send + Sync>;

/// Layer replacing the inner chain with a function of the request.
///
/// # Example
///
/// ```ignore
/// use spool::middleware::MockLayer;
///
/// let layer = MockLayer::respond(|request| match request.url().path() {
///     "/health" => (200, "ok"),
///     _ => (404, "missing"),
/// });
/// ```
#[derive(Clone)]
pub struct MockLayer {
    mock: MockFn,
}

impl std::fmt::Debug for MockLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLayer").finish_non_exhaustive()
    }
}

impl MockLayer {
    /// Answer every call with `mock(request)`.
    pub fn new<F>(mock: F) -> Self
    where
        F: Fn(&Request<Bytes>) -> Result<Response<Bytes>> + Send + Sync + 'static,
    {
        Self {
            mock: Arc::new(mock),
        }
    }

    /// Answer every call with a response built from `(status, body)`.
    ///
    /// The response carries the request URL and no headers.
    pub fn respond<F, B>(mock: F) -> Self
    where
        F: Fn(&Request<Bytes>) -> (u16, B) + Send + Sync + 'static,
        B: Into<Bytes>,
    {
        Self::new(move |request| {
            let (status, body) = mock(request);
            Ok(Response::new(status, Default::default(), body.into()).with_url(request.url().clone()))
        })
    }
}

impl<S> Layer<S> for MockLayer {
    type Service = Mock;

    fn layer(&self, _inner: S) -> Self::Service {
        Mock {
            mock: Arc::clone(&self.mock),
        }
    }
}

/// Service answering with a mock function. Holds no inner service.
#[derive(Clone)]
pub struct Mock {
    mock: MockFn,
}

impl std::fmt::Debug for Mock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mock").finish_non_exhaustive()
    }
}

impl Service<Request<Bytes>> for Mock {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let outcome = (self.mock)(&request);
        Box::pin(async move { outcome })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tower::{ServiceExt, service_fn};

    use super::*;

    fn request(path: &str) -> Request<Bytes> {
        let url = url::Url::parse("http://example.com").expect("url").join(path).expect("path");
        Request::builder(crate::Method::GET, url).build()
    }

    #[tokio::test]
    async fn inner_service_is_never_called() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let inner = service_fn(move |_request: Request<Bytes>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<Response<Bytes>, _>(Error::connection("unreachable")) }
        });

        let service = MockLayer::respond(|_| (200, "mocked")).layer(inner);
        let response = service.oneshot(request("/")).await.expect("response");

        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), &Bytes::from("mocked"));
        assert_eq!(response.url().map(url::Url::as_str), Some("http://example.com/"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn mock_can_route_and_fail() {
        let layer = MockLayer::new(|request| match request.url().path() {
            "/ok" => Ok(Response::new(204, Default::default(), Bytes::new())),
            _ => Err(Error::Timeout),
        });

        let ok = layer.layer(()).oneshot(request("/ok")).await.expect("ok");
        assert_eq!(ok.status(), 204);

        let err = layer.layer(()).oneshot(request("/slow")).await.expect_err("timeout");
        assert!(err.is_timeout());
    }
}
