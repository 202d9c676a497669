//! Static header middleware: custom headers, JSON content negotiation and bearer auth.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower::{Layer, Service};

use crate::{Error, Request, Response, Result, header};

const APPLICATION_JSON: &str = "application/json";

/// Layer that sets a fixed set of headers on every request.
///
/// Headers set by the layer replace any value already on the request, whatever the
/// case of the existing name.
///
/// # Example
///
/// ```ignore
/// use spool::middleware::HeaderLayer;
///
/// let layer = HeaderLayer::new("X-Client", "spool").header("X-Trace", "on");
/// ```
#[derive(Debug, Clone)]
pub struct HeaderLayer {
    headers: Arc<[(String, String)]>,
}

impl HeaderLayer {
    /// Create a layer setting `name: value`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let header: (String, String) = (name.into(), value.into());
        Self {
            headers: Arc::from([header]),
        }
    }

    /// Also set `name: value`.
    #[must_use]
    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers = self.headers.to_vec();
        headers.push((name.into(), value.into()));
        Self {
            headers: headers.into(),
        }
    }
}

impl<S> Layer<S> for HeaderLayer {
    type Service = SetHeaders<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SetHeaders {
            inner,
            headers: Arc::clone(&self.headers),
        }
    }
}

/// Layer setting `Accept` and `Content-Type` to `application/json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHeadersLayer;

impl<S> Layer<S> for JsonHeadersLayer {
    type Service = SetHeaders<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SetHeaders {
            inner,
            headers: Arc::from([
                (header::ACCEPT.to_string(), APPLICATION_JSON.to_string()),
                (header::CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string()),
            ]),
        }
    }
}

/// Layer adding `Authorization: Bearer <token>`.
///
/// [`super::LoggingLayer`] redacts the header value.
#[derive(Clone)]
pub struct BearerAuthLayer {
    headers: Arc<[(String, String)]>,
}

impl BearerAuthLayer {
    /// Create a layer authenticating with `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            headers: Arc::from([(
                header::AUTHORIZATION.to_string(),
                format!("Bearer {}", token.into()),
            )]),
        }
    }
}

impl std::fmt::Debug for BearerAuthLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuthLayer").finish_non_exhaustive()
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = SetHeaders<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SetHeaders {
            inner,
            headers: Arc::clone(&self.headers),
        }
    }
}

/// Service that sets headers on requests before the inner service sees them.
#[derive(Debug, Clone)]
pub struct SetHeaders<S> {
    inner: S,
    headers: Arc<[(String, String)]>,
}

impl<S> Service<Request<Bytes>> for SetHeaders<S>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Bytes>) -> Self::Future {
        for (name, value) in self.headers.iter() {
            let headers = request.headers_mut();
            // header names are case-insensitive on the wire
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
            headers.insert(name.clone(), value.clone());
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(request).await })
    }
}
