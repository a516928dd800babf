//! Application configuration structures
//!
//! Only `database`, `api` and `extraction.markets` have no sensible default;
//! every other section may be omitted from a config file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_SEED_SECS, DEFAULT_BATCH_SIZE, DEFAULT_DB_POOL_SIZE,
    DEFAULT_FANOUT_CONCURRENCY, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_INTER_BATCH_PAUSE_MS,
    DEFAULT_LOCK_FILE, DEFAULT_MAX_BACKOFF_SECS, DEFAULT_METRICS_PATH, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_BASE, DEFAULT_RETRY_INITIAL_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_SECS,
    DEFAULT_RUN_RETRY_COOLDOWN_SECS, DEFAULT_SAFETY_MARGIN_MS, DEFAULT_STALE_AFTER_DAYS,
    DEFAULT_WINDOW_MAX_REQUESTS, DEFAULT_WINDOW_SECS,
};
use crate::errors::{OrderFlowError, Result};
use crate::types::ApiEndpoint;

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub extraction: ExtractionSettings,
    #[serde(default)]
    pub rate_limits: RateLimitSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Reject values that would make the pipeline misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(OrderFlowError::Config("database.path must not be empty".into()));
        }
        if self.database.pool_size == 0 {
            return Err(OrderFlowError::Config("database.pool_size must be positive".into()));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(OrderFlowError::Config("api.base_url must not be empty".into()));
        }
        if self.extraction.markets.iter().all(|m| m.trim().is_empty()) {
            return Err(OrderFlowError::Config(
                "extraction.markets must list at least one marketplace".into(),
            ));
        }
        if self.extraction.batch_size == 0 {
            return Err(OrderFlowError::Config("extraction.batch_size must be positive".into()));
        }
        if self.extraction.fanout_concurrency == 0 {
            return Err(OrderFlowError::Config(
                "extraction.fanout_concurrency must be positive".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(OrderFlowError::Config("retry.max_attempts must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

/// Marketplace API connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Override for one endpoint's request window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointLimitOverride {
    pub endpoint: ApiEndpoint,
    pub max_requests: u32,
    pub window_secs: u64,
    #[serde(default)]
    pub burst_limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub default_max_requests: u32,
    pub default_window_secs: u64,
    pub safety_margin_ms: u64,
    pub backoff_seed_secs: u64,
    pub max_backoff_secs: u64,
    /// Replaces the built-in window for the listed endpoints
    pub overrides: Vec<EndpointLimitOverride>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            default_max_requests: DEFAULT_WINDOW_MAX_REQUESTS,
            default_window_secs: DEFAULT_WINDOW_SECS,
            safety_margin_ms: DEFAULT_SAFETY_MARGIN_MS,
            backoff_seed_secs: DEFAULT_BACKOFF_SEED_SECS,
            max_backoff_secs: DEFAULT_MAX_BACKOFF_SECS,
            overrides: Vec::new(),
        }
    }
}

/// Per-call retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub backoff_base: f64,
    pub initial_delay_ms: u64,
    pub max_delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff_base: DEFAULT_RETRY_BASE,
            initial_delay_ms: DEFAULT_RETRY_INITIAL_DELAY_MS,
            max_delay_secs: DEFAULT_RETRY_MAX_DELAY_SECS,
        }
    }
}

/// Run orchestration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSettings {
    pub markets: Vec<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: i64,
    #[serde(default = "default_cooldown_secs")]
    pub retry_cooldown_secs: u64,
    #[serde(default = "default_inter_batch_pause_ms")]
    pub inter_batch_pause_ms: u64,
    #[serde(default = "default_fanout")]
    pub fanout_concurrency: usize,
    #[serde(default = "default_lock_file")]
    pub lock_file: String,
}

impl ExtractionSettings {
    pub fn new(markets: Vec<String>) -> Self {
        Self {
            markets,
            batch_size: DEFAULT_BATCH_SIZE,
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            retry_cooldown_secs: DEFAULT_RUN_RETRY_COOLDOWN_SECS,
            inter_batch_pause_ms: DEFAULT_INTER_BATCH_PAUSE_MS,
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
            lock_file: DEFAULT_LOCK_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// JSON-lines file receiving run events
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { path: DEFAULT_METRICS_PATH.to_string() }
    }
}

const fn default_pool_size() -> u32 {
    DEFAULT_DB_POOL_SIZE
}

const fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

const fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

const fn default_stale_after_days() -> i64 {
    DEFAULT_STALE_AFTER_DAYS
}

const fn default_cooldown_secs() -> u64 {
    DEFAULT_RUN_RETRY_COOLDOWN_SECS
}

const fn default_inter_batch_pause_ms() -> u64 {
    DEFAULT_INTER_BATCH_PAUSE_MS
}

const fn default_fanout() -> usize {
    DEFAULT_FANOUT_CONCURRENCY
}

fn default_lock_file() -> String {
    DEFAULT_LOCK_FILE.to_string()
}
