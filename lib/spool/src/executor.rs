//! The composed request executor and its chain builder.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;

use crate::middleware::{
    BearerAuthLayer, CacheLayer, CacheStore, ErrorOnStatusLayer, HeaderLayer, JsonHeadersLayer,
    LoggingLayer, MockLayer, RetryConfig, RetryLayer,
};
use crate::{Error, Request, Response, Result, StatusCodeRange};

/// Type-erased service for middleware composition.
///
/// Layers are stored and composed as this type so the executor does not expose
/// the nested generic type of the whole chain.
pub type BoxedService = BoxCloneService<Request<Bytes>, Response<Bytes>, Error>;

/// Future type for the Tower `Service` implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response<Bytes>>> + Send + 'static>>;

type LayerFn = Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>;

/// `Sync` wrapper for [`BoxedService`].
///
/// Each call clones the chain under the lock and releases it before running,
/// so concurrent calls never wait on each other.
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, request: Request<Bytes>) -> ServiceFuture {
        let service = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        Box::pin(async move {
            use tower::ServiceExt;
            service.oneshot(request).await
        })
    }
}

/// A terminal transport call wrapped by an immutable chain of middleware.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use spool::{Executor, HyperTransport, StatusCodeRange};
/// use spool::middleware::RetryConfig;
///
/// let executor = Executor::builder(HyperTransport::new())
///     .with_bearer_auth("my-token")
///     .with_retry(RetryConfig::builder().max_retries(3).build())
///     .with_error_on_status([StatusCodeRange::CLIENT_ERRORS])
///     .build();
/// ```
#[derive(Clone)]
pub struct Executor {
    service: SyncService,
    layers: usize,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// An executor equivalent to the raw terminal call.
    #[must_use]
    pub fn new<T>(terminal: T) -> Self
    where
        T: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>
            + Clone
            + Send
            + 'static,
        T::Future: Send + 'static,
    {
        ExecutorBuilder::new(terminal).build()
    }

    /// Start composing middleware around `terminal`.
    #[must_use]
    pub fn builder<T>(terminal: T) -> ExecutorBuilder
    where
        T: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>
            + Clone
            + Send
            + 'static,
        T::Future: Send + 'static,
    {
        ExecutorBuilder::new(terminal)
    }

    /// Number of middleware layers around the terminal call.
    #[must_use]
    pub const fn layer_count(&self) -> usize {
        self.layers
    }
}

impl spool_core::HttpClient for Executor {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        self.service.call(request).await
    }
}

impl Service<Request<Bytes>> for Executor {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        // readiness of the chain is awaited per call
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        self.service.call(request)
    }
}

/// Builder for [`Executor`].
///
/// Layers apply in the order they are added: the first one added is the outermost,
/// so it sees the request first and the result last.
///
/// ```text
/// Request  → first → second → … → terminal
/// Response ← first ← second ← … ← terminal
/// ```
pub struct ExecutorBuilder {
    terminal: BoxedService,
    layers: Vec<LayerFn>,
}

impl std::fmt::Debug for ExecutorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorBuilder")
            .field("layers_count", &self.layers.len())
            .finish_non_exhaustive()
    }
}

impl ExecutorBuilder {
    /// Create a builder around a terminal transport service.
    #[must_use]
    pub fn new<T>(terminal: T) -> Self
    where
        T: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>
            + Clone
            + Send
            + 'static,
        T::Future: Send + 'static,
    {
        Self {
            terminal: BoxCloneService::new(terminal),
            layers: Vec::new(),
        }
    }

    // ========================================================================
    // Generic Middleware API
    // ========================================================================

    /// Add a Tower layer to the chain.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request<Bytes>>>::Future: Send + 'static,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    /// Retry retryable outcomes with exponential backoff.
    #[must_use]
    pub fn with_retry(self, config: RetryConfig) -> Self {
        self.layer(RetryLayer::new(config))
    }

    /// Cache responses in `layer`'s store.
    #[must_use]
    pub fn with_cache<S: CacheStore>(self, layer: CacheLayer<S>) -> Self {
        self.layer(layer)
    }

    /// Write-through caching with the given TTL.
    #[must_use]
    pub fn with_write_through_cache<S: CacheStore>(self, store: S, ttl: Duration) -> Self {
        self.layer(CacheLayer::write_through(store, ttl))
    }

    /// Serve exclusively from `store`; the inner chain is never called.
    #[must_use]
    pub fn with_cache_only<S: CacheStore>(self, store: S) -> Self {
        self.layer(CacheLayer::cache_only(store))
    }

    /// Turn responses whose status falls in `ranges` into [`Error::Status`].
    #[must_use]
    pub fn with_error_on_status(self, ranges: impl IntoIterator<Item = StatusCodeRange>) -> Self {
        self.layer(ErrorOnStatusLayer::new(ranges))
    }

    /// Add bearer token authentication.
    #[must_use]
    pub fn with_bearer_auth(self, token: impl Into<String>) -> Self {
        self.layer(BearerAuthLayer::new(token))
    }

    /// Set a static header on every request.
    #[must_use]
    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.layer(HeaderLayer::new(name, value))
    }

    /// Set JSON `Accept` and `Content-Type` headers on every request.
    #[must_use]
    pub fn with_json_headers(self) -> Self {
        self.layer(JsonHeadersLayer)
    }

    /// Add request/response logging.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.layer(LoggingLayer::new())
    }

    /// Add debug-level logging (includes headers).
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.layer(LoggingLayer::debug())
    }

    /// Replace everything inward of this point with a canned outcome.
    #[must_use]
    pub fn with_mock<F>(self, mock: F) -> Self
    where
        F: Fn(&Request<Bytes>) -> Result<Response<Bytes>> + Send + Sync + 'static,
    {
        self.layer(MockLayer::new(mock))
    }

    /// Replace everything inward of this point with a `(status, body)` response.
    #[must_use]
    pub fn with_mock_response<F, B>(self, mock: F) -> Self
    where
        F: Fn(&Request<Bytes>) -> (u16, B) + Send + Sync + 'static,
        B: Into<Bytes>,
    {
        self.layer(MockLayer::respond(mock))
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Compose the chain. The result is immutable.
    #[must_use]
    pub fn build(self) -> Executor {
        let layers = self.layers.len();

        // innermost first, so the first layer added ends up outermost
        let service = self
            .layers
            .into_iter()
            .rev()
            .fold(self.terminal, |service, layer_fn| layer_fn(service));

        Executor {
            service: SyncService::new(service),
            layers,
        }
    }
}
