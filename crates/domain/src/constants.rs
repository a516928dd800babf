//! Application constants
//!
//! Defaults that configuration falls back to when a value is not supplied.

// Extraction windows per mode
pub const DAILY_FULL_WINDOW_HOURS: i64 = 24;
pub const INCREMENTAL_WINDOW_HOURS: i64 = 1;
pub const STATUS_UPDATE_WINDOW_HOURS: i64 = 2;
pub const WEEKLY_CATCH_UP_WINDOW_DAYS: i64 = 7;

// Batching and pacing
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_INTER_BATCH_PAUSE_MS: u64 = 1_000;
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 4;
pub const DEFAULT_RUN_RETRY_COOLDOWN_SECS: u64 = 30;
pub const DEFAULT_STALE_AFTER_DAYS: i64 = 7;

// Rate limiting
pub const DEFAULT_WINDOW_MAX_REQUESTS: u32 = 100;
pub const DEFAULT_WINDOW_SECS: u64 = 60;
pub const DEFAULT_SAFETY_MARGIN_MS: u64 = 100;
pub const DEFAULT_BACKOFF_SEED_SECS: u64 = 1;
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 300;

// Per-call retry
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE: f64 = 2.0;
pub const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RETRY_MAX_DELAY_SECS: u64 = 60;

// HTTP
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// Storage and observability
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;
pub const DEFAULT_METRICS_PATH: &str = "logs/metrics.jsonl";
pub const DEFAULT_LOCK_FILE: &str = "orderflow.lock";
