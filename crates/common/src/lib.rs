//! Modular common utilities shared across OrderFlow crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: `thiserror`-based error types, no runtime side effects
//! - `runtime`: async infrastructure (resilience: rate limiting and retry)
//! - `observability`: tracing support (pulled in by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use resilience::{
    RateLimiter, RateLimiterConfig, RetryConfig, RetryError, RetryExecutor, RetryPolicy,
    WindowLimit,
};
