//! Response caching keyed by request fingerprint.
//!
//! Two entries are kept per fingerprint: the body under the fingerprint itself and the
//! JSON encoded header map under [`Fingerprint::headers_key`].
//!
//! Bodies are buffered [`Bytes`], so the copy handed to the store and the copy returned
//! to the caller are independent readers of one allocation. Large bodies are held in
//! memory in full.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::Fingerprint;
use crate::{CacheStore, Error, Request, Response, Result, StoreError};

const NOT_FOUND_BODY: &str = "Not found";

/// Operating mode of the cache middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Call through and store every response the inner service returns.
    #[default]
    WriteThrough,
    /// Never call through; serve from the store or answer 404.
    CacheOnly,
}

/// Layer that caches responses in a [`CacheStore`].
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use spool::MemoryStore;
/// use spool::middleware::CacheLayer;
///
/// let store = MemoryStore::new();
/// let record = CacheLayer::write_through(store.clone(), Duration::from_secs(300));
/// let replay = CacheLayer::cache_only(store);
/// ```
///
/// Write-through stores non-2xx responses too; a cache-only replay of them answers
/// `200 OK` with the recorded body. Use [`CacheLayer::success_only`] to skip them.
#[derive(Debug)]
pub struct CacheLayer<S> {
    store: Arc<S>,
    mode: CacheMode,
    ttl: Duration,
    success_only: bool,
}

impl<S> Clone for CacheLayer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            mode: self.mode,
            ttl: self.ttl,
            success_only: self.success_only,
        }
    }
}

impl<S: CacheStore> CacheLayer<S> {
    /// Create a cache layer.
    pub fn new(mode: CacheMode, ttl: Duration, store: S) -> Self {
        Self {
            store: Arc::new(store),
            mode,
            ttl,
            success_only: false,
        }
    }

    /// Call through and store responses for `ttl`.
    pub fn write_through(store: S, ttl: Duration) -> Self {
        Self::new(CacheMode::WriteThrough, ttl, store)
    }

    /// Serve exclusively from `store`.
    pub fn cache_only(store: S) -> Self {
        Self::new(CacheMode::CacheOnly, Duration::ZERO, store)
    }

    /// Only store 2xx responses in write-through mode.
    #[must_use]
    pub fn success_only(mut self) -> Self {
        self.success_only = true;
        self
    }

    /// The configured mode.
    #[must_use]
    pub const fn mode(&self) -> CacheMode {
        self.mode
    }
}

impl<S, Inner> Layer<Inner> for CacheLayer<S> {
    type Service = Cache<Inner, S>;

    fn layer(&self, inner: Inner) -> Self::Service {
        Cache {
            inner,
            store: Arc::clone(&self.store),
            mode: self.mode,
            ttl: self.ttl,
            success_only: self.success_only,
        }
    }
}

/// Service that caches responses of the inner service.
#[derive(Debug)]
pub struct Cache<Inner, S> {
    inner: Inner,
    store: Arc<S>,
    mode: CacheMode,
    ttl: Duration,
    success_only: bool,
}

impl<Inner: Clone, S> Clone for Cache<Inner, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            store: Arc::clone(&self.store),
            mode: self.mode,
            ttl: self.ttl,
            success_only: self.success_only,
        }
    }
}

fn not_found(request: &Request<Bytes>) -> Response<Bytes> {
    Response::new(404, HashMap::new(), Bytes::from_static(NOT_FOUND_BODY.as_bytes()))
        .with_url(request.url().clone())
}

async fn lookup<S: CacheStore>(
    store: &S,
    key: &Fingerprint,
) -> std::result::Result<(HashMap<String, String>, Bytes), StoreError> {
    let raw_headers = store.get(&key.headers_key()).await?;
    let body = store.get(key.as_str()).await?;
    let headers = serde_json::from_slice(&raw_headers)
        .map_err(|err| StoreError::Unavailable(format!("corrupt headers entry: {err}")))?;
    Ok((headers, body))
}

async fn serve_from_store<S: CacheStore>(store: &S, request: &Request<Bytes>) -> Response<Bytes> {
    let key = Fingerprint::of(request);
    match lookup(store, &key).await {
        Ok((headers, body)) => {
            debug!(%key, url = %request.url(), "cache hit");
            Response::new(200, headers, body)
                .with_reason("OK")
                .with_url(request.url().clone())
        }
        Err(StoreError::NotFound) => {
            debug!(%key, url = %request.url(), "cache miss");
            not_found(request)
        }
        Err(err) => {
            warn!(%key, error = %err, "cache read failed, answering not found");
            not_found(request)
        }
    }
}

async fn save<S: CacheStore>(store: &S, key: &Fingerprint, ttl: Duration, response: &Response<Bytes>) {
    let headers = match serde_json::to_vec(response.headers()) {
        Ok(headers) => Bytes::from(headers),
        Err(err) => {
            warn!(%key, error = %err, "could not serialize headers, skipping cache");
            return;
        }
    };

    // an entry whose body write failed is still overwritten by the next save
    if let Err(err) = store.set(key.as_str(), ttl, response.body().clone()).await {
        warn!(%key, error = %err, "cache write failed");
        return;
    }
    if let Err(err) = store.set(&key.headers_key(), ttl, headers).await {
        warn!(%key, error = %err, "cache write failed");
    }
}

impl<Inner, S> Service<Request<Bytes>> for Cache<Inner, S>
where
    Inner: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>
        + Clone
        + Send
        + 'static,
    Inner::Future: Send,
    S: CacheStore,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        match self.mode {
            CacheMode::WriteThrough => self.inner.poll_ready(cx),
            CacheMode::CacheOnly => Poll::Ready(Ok(())),
        }
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let store = Arc::clone(&self.store);
        let ttl = self.ttl;
        let success_only = self.success_only;

        match self.mode {
            CacheMode::CacheOnly => {
                Box::pin(async move { Ok(serve_from_store(store.as_ref(), &request).await) })
            }
            CacheMode::WriteThrough => {
                let key = Fingerprint::of(&request);
                let mut inner = self.inner.clone();
                std::mem::swap(&mut self.inner, &mut inner);

                Box::pin(async move {
                    let response = inner.call(request).await?;
                    if success_only && !response.is_success() {
                        debug!(%key, status = response.status(), "not caching non-2xx response");
                    } else {
                        save(store.as_ref(), &key, ttl, &response).await;
                    }
                    Ok(response)
                })
            }
        }
    }
}
