//! Rate-limited, retry-wrapped marketplace access
//!
//! One logical API call is: acquire a limiter slot, perform the call, reset
//! the endpoint backoff on success. A throttling failure escalates the
//! endpoint backoff before the next attempt, never after the last one.
//! [`guarded_call`] is the explicit wrapper; [`RateLimitedMarketplace`]
//! applies it to every method of an inner [`MarketplaceApi`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orderflow_common::resilience::{
    RateLimiter, RateLimiterConfig, RetryConfig, RetryDecision, RetryError, RetryExecutor,
    RetryPolicy, WindowLimit,
};
use orderflow_domain::{
    ApiEndpoint, OrderFlowError, OrderItem, OrderPage, OrderQuery, OrderRecord,
    RateLimitSettings, Result, RetrySettings, SalesInterval, SalesMetric,
};
use tracing::debug;

use super::ports::MarketplaceApi;

/// Published request budgets of the marketplace, per endpoint family.
pub fn default_endpoint_limits() -> HashMap<ApiEndpoint, WindowLimit> {
    let minute = Duration::from_secs(60);
    HashMap::from([
        (ApiEndpoint::Orders, WindowLimit::new(6, minute).with_burst(20)),
        (ApiEndpoint::Order, WindowLimit::new(6, minute)),
        (ApiEndpoint::OrderItems, WindowLimit::new(300, minute).with_burst(100)),
        (ApiEndpoint::Sales, WindowLimit::new(45, minute).with_burst(15)),
        (ApiEndpoint::Offers, WindowLimit::new(5, minute).with_burst(10)),
        (ApiEndpoint::Reports, WindowLimit::new(15, minute).with_burst(10)),
    ])
}

/// Build the limiter configuration: built-in endpoint budgets, then any
/// configured overrides on top.
pub fn rate_limiter_config(settings: &RateLimitSettings) -> Result<RateLimiterConfig<ApiEndpoint>> {
    let overrides = settings.overrides.iter().map(|entry| {
        let limit = WindowLimit::new(entry.max_requests, Duration::from_secs(entry.window_secs));
        let limit = match entry.burst_limit {
            Some(burst) => limit.with_burst(burst),
            None => limit,
        };
        (entry.endpoint, limit)
    });

    RateLimiterConfig::builder()
        .default_limit(WindowLimit::new(
            settings.default_max_requests,
            Duration::from_secs(settings.default_window_secs),
        ))
        .limits(default_endpoint_limits())
        .limits(overrides)
        .safety_margin(Duration::from_millis(settings.safety_margin_ms))
        .backoff_seed(Duration::from_secs(settings.backoff_seed_secs))
        .max_backoff(Duration::from_secs(settings.max_backoff_secs))
        .build()
        .map_err(|e| OrderFlowError::Config(format!("Invalid rate limit settings: {e}")))
}

pub fn retry_config(settings: &RetrySettings) -> Result<RetryConfig> {
    RetryConfig::builder()
        .max_attempts(settings.max_attempts)
        .exponential_backoff(
            Duration::from_millis(settings.initial_delay_ms),
            settings.backoff_base,
            Duration::from_secs(settings.max_delay_secs),
        )
        .build()
        .map_err(|e| OrderFlowError::Config(format!("Invalid retry settings: {e}")))
}

/// Retries throttling, network, timeout and 5xx failures of one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ApiRetryPolicy {
    endpoint: ApiEndpoint,
}

impl ApiRetryPolicy {
    pub const fn new(endpoint: ApiEndpoint) -> Self {
        Self { endpoint }
    }
}

impl RetryPolicy<OrderFlowError> for ApiRetryPolicy {
    fn should_retry(&self, error: &OrderFlowError, _attempt: u32) -> RetryDecision {
        if error.is_retryable_call() {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }

    fn on_retry(&self, error: &OrderFlowError, attempt: u32, delay: Duration) {
        debug!(
            endpoint = %self.endpoint,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "marketplace.call.retry"
        );
    }
}

/// Run `call` against `endpoint` under the limiter and the retry policy.
///
/// Retry exhaustion surfaces as `OrderFlowError::RetriesExhausted` wrapping
/// the last failure; a non-retryable failure is returned unchanged.
pub async fn guarded_call<T, F, Fut>(
    limiter: &RateLimiter<ApiEndpoint>,
    retry: &RetryConfig,
    endpoint: ApiEndpoint,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let executor = RetryExecutor::new(retry.clone(), ApiRetryPolicy::new(endpoint));
    let max_attempts = retry.max_attempts;
    let attempts = AtomicU32::new(0);

    let outcome = executor
        .execute(|| {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let request = call();
            async move {
                limiter.acquire(&endpoint).await;
                match request.await {
                    Ok(value) => {
                        limiter.record_success(&endpoint).await;
                        Ok(value)
                    }
                    Err(err) => {
                        if err.is_throttling() && attempt < max_attempts {
                            limiter.handle_rate_limit_error(&endpoint, err.retry_after()).await;
                        }
                        Err(err)
                    }
                }
            }
        })
        .await;

    outcome.map_err(|err| match err {
        RetryError::Exhausted { attempts, source } => {
            OrderFlowError::RetriesExhausted { attempts, last: Box::new(source) }
        }
        RetryError::NonRetryable { source, .. } => source,
    })
}

/// `MarketplaceApi` decorator that routes every call through [`guarded_call`]
pub struct RateLimitedMarketplace {
    inner: Arc<dyn MarketplaceApi>,
    limiter: Arc<RateLimiter<ApiEndpoint>>,
    retry: RetryConfig,
}

impl RateLimitedMarketplace {
    pub fn new(
        inner: Arc<dyn MarketplaceApi>,
        limiter: Arc<RateLimiter<ApiEndpoint>>,
        retry: RetryConfig,
    ) -> Self {
        Self { inner, limiter, retry }
    }
}

#[async_trait]
impl MarketplaceApi for RateLimitedMarketplace {
    async fn get_orders_page(
        &self,
        query: &OrderQuery,
        cursor: Option<&str>,
    ) -> Result<OrderPage> {
        guarded_call(&self.limiter, &self.retry, ApiEndpoint::Orders, || {
            self.inner.get_orders_page(query, cursor)
        })
        .await
    }

    async fn get_order(&self, order_id: &str) -> Result<OrderRecord> {
        guarded_call(&self.limiter, &self.retry, ApiEndpoint::Order, || {
            self.inner.get_order(order_id)
        })
        .await
    }

    async fn get_order_items(&self, order_id: &str) -> Result<Vec<OrderItem>> {
        guarded_call(&self.limiter, &self.retry, ApiEndpoint::OrderItems, || {
            self.inner.get_order_items(order_id)
        })
        .await
    }

    async fn get_sales_metrics(
        &self,
        asin: &str,
        sku: &str,
        marketplace_id: &str,
        interval: &SalesInterval,
    ) -> Result<Vec<SalesMetric>> {
        guarded_call(&self.limiter, &self.retry, ApiEndpoint::Sales, || {
            self.inner.get_sales_metrics(asin, sku, marketplace_id, interval)
        })
        .await
    }
}
