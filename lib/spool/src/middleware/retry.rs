//! Retry with exponential backoff.
//!
//! The first attempt always runs. While the outcome is retryable and the budget allows,
//! the middleware waits, re-sends a clone of the request and grows the delay:
//!
//! ```text
//! delay₀ = min(delay_min, delay_max)
//! delayₙ₊₁ = min(delayₙ · ramp, delay_max)
//! ```
//!
//! Waits race the request's [`spool_core::CallContext`]. Exhausting the budget on a
//! retryable outcome yields [`Error::MaxRetries`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use tower::{Layer, Service, ServiceExt};
use tracing::{debug, warn};

use crate::{Error, Request, Response, Result, StatusCodeRange, in_ranges};

/// Retry parameters.
///
/// Built through [`RetryConfig::builder`], [`RetryConfig::default`] or
/// [`RetryConfig::immediate`]; the ramp is always at least 1 and the ranges never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    max_retries: u32,
    delay_min: Duration,
    delay_max: Duration,
    ramp: f64,
    ranges: Vec<StatusCodeRange>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_min: Duration::from_millis(100),
            delay_max: Duration::from_secs(5),
            ramp: 2.0,
            ranges: vec![StatusCodeRange::NON_2XX],
        }
    }
}

impl RetryConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Retry up to `max_retries` times without waiting.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            delay_min: Duration::ZERO,
            delay_max: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Additional attempts after the first one.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// First wait.
    #[must_use]
    pub const fn delay_min(&self) -> Duration {
        self.delay_min
    }

    /// Ceiling for every wait.
    #[must_use]
    pub const fn delay_max(&self) -> Duration {
        self.delay_max
    }

    /// Multiplier applied to the delay after each wait.
    #[must_use]
    pub const fn ramp(&self) -> f64 {
        self.ramp
    }

    /// Status codes to retry on.
    #[must_use]
    pub fn ranges(&self) -> &[StatusCodeRange] {
        &self.ranges
    }

    fn normalized(mut self) -> Self {
        // NaN.max(1.0) is 1.0
        self.ramp = self.ramp.max(1.0);
        if self.ranges.is_empty() {
            self.ranges = vec![StatusCodeRange::NON_2XX];
        }
        self
    }

    /// Whether an outcome should be retried.
    #[must_use]
    pub fn is_retryable(&self, outcome: &Result<Response<Bytes>>) -> bool {
        match outcome {
            Ok(response) => in_ranges(response.status(), &self.ranges),
            Err(_) => true,
        }
    }

    /// The delay to use after `delay`.
    #[must_use]
    pub fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.ramp)
            .map_or(self.delay_max, |next| next.min(self.delay_max))
    }

    fn first_delay(&self) -> Duration {
        self.delay_min.min(self.delay_max)
    }
}

/// Builder for [`RetryConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetryConfigBuilder {
    max_retries: Option<u32>,
    delay_min: Option<Duration>,
    delay_max: Option<Duration>,
    ramp: Option<f64>,
    ranges: Vec<StatusCodeRange>,
}

impl RetryConfigBuilder {
    /// Set the number of additional attempts.
    #[must_use]
    pub const fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set the first wait.
    #[must_use]
    pub const fn delay_min(mut self, delay: Duration) -> Self {
        self.delay_min = Some(delay);
        self
    }

    /// Set the ceiling for every wait.
    #[must_use]
    pub const fn delay_max(mut self, delay: Duration) -> Self {
        self.delay_max = Some(delay);
        self
    }

    /// Set the backoff multiplier. Values below 1 (or NaN) are treated as 1.
    #[must_use]
    pub const fn ramp(mut self, ramp: f64) -> Self {
        self.ramp = Some(ramp);
        self
    }

    /// Retry on responses whose status falls in `range`. May be called repeatedly.
    ///
    /// Without any range, every non-2xx status is retried.
    #[must_use]
    pub fn retry_on(mut self, range: impl Into<StatusCodeRange>) -> Self {
        self.ranges.push(range.into());
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> RetryConfig {
        let defaults = RetryConfig::default();
        RetryConfig {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            delay_min: self.delay_min.unwrap_or(defaults.delay_min),
            delay_max: self.delay_max.unwrap_or(defaults.delay_max),
            ramp: self.ramp.unwrap_or(defaults.ramp),
            ranges: self.ranges,
        }
        .normalized()
    }
}

/// Layer that retries retryable outcomes with exponential backoff.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use spool::middleware::{RetryConfig, RetryLayer};
///
/// let layer = RetryLayer::new(
///     RetryConfig::builder()
///         .max_retries(5)
///         .delay_min(Duration::from_millis(50))
///         .delay_max(Duration::from_secs(2))
///         .retry_on(500..=599)
///         .build(),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RetryLayer {
    config: Arc<RetryConfig>,
}

impl RetryLayer {
    /// Create a retry layer.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config: Arc::new(config.normalized()),
        }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = Retry<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Retry {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Service that retries retryable outcomes of the inner service.
#[derive(Debug, Clone)]
pub struct Retry<S> {
    inner: S,
    config: Arc<RetryConfig>,
}

impl<S> Retry<S> {
    /// Create a retry service wrapping the given service.
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self {
            inner,
            config: Arc::new(config.normalized()),
        }
    }
}

async fn attempt<S>(inner: &mut S, request: Request<Bytes>) -> Result<Response<Bytes>>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>,
{
    inner.ready().await?.call(request).await
}

impl<S> Service<Request<Bytes>> for Retry<S>
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

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let config = Arc::clone(&self.config);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let context = request.context().clone();
            let mut outcome = attempt(&mut inner, request.clone()).await;
            let mut attempts = 1_u32;
            let mut delay = config.first_delay();

            while attempts <= config.max_retries && config.is_retryable(&outcome) {
                debug!(
                    attempt = attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    url = %request.url(),
                    "retrying request"
                );

                tokio::select! {
                    biased;
                    err = context.done() => return Err(err),
                    () = tokio::time::sleep(delay) => {}
                }
                delay = config.next_delay(delay);

                outcome = attempt(&mut inner, request.clone()).await;
                attempts += 1;
            }

            match outcome {
                Ok(response) if in_ranges(response.status(), &config.ranges) => {
                    warn!(status = response.status(), attempts, "max retries reached");
                    Err(Error::max_retries(attempts, Error::from_response(response)))
                }
                Err(err) => {
                    warn!(error = %err, attempts, "max retries reached");
                    Err(Error::max_retries(attempts, err))
                }
                ok => ok,
            }
        })
    }
}
