//! Resilience patterns for talking to quota-limited remote services
//!
//! This module provides **generic, reusable** building blocks:
//! - **Rate Limiter**: per-key sliding-window admission with an adaptive
//!   backoff that grows on throttling signals and resets on success
//! - **Retry Logic**: bounded retries with exponential backoff and a
//!   pluggable policy deciding which failures are worth another attempt
//!
//! Neither type knows anything about orders or marketplaces. Keys and error
//! types are generic; the domain wiring lives in `orderflow-core`.
//!
//! All waiting goes through `tokio::time`, so both primitives can be driven
//! deterministically from tests with a paused clock.

pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::{
    RateLimitConfigError, RateLimitUsage, RateLimiter, RateLimiterConfig, RateLimiterConfigBuilder,
    WindowLimit,
};
pub use retry::{
    policies, retry_with_policy, BackoffStrategy, RetryConfig, RetryConfigBuilder,
    RetryConfigError, RetryDecision, RetryError, RetryExecutor, RetryPolicy, RetryResult,
};
