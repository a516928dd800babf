//! Error types used throughout the application

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AlertLevel, ErrorCategory};

/// Message fragments that mark an error as transient regardless of variant.
const TRANSIENT_MARKERS: &[&str] =
    &["connection", "timeout", "timed out", "rate limit", "throttl", "429"];

/// Main error type for OrderFlow
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum OrderFlowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Throttled by marketplace API (retry after {retry_after_secs:?}s)")]
    Throttled { retry_after_secs: Option<u64> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected payload: {0}")]
    Schema(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<OrderFlowError> },
}

impl OrderFlowError {
    /// Short stable label, used as a log field and for alert de-duplication.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Database(_) => "database",
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::Throttled { .. } => "throttled",
            Self::NotFound(_) => "not_found",
            Self::Api { .. } => "api",
            Self::Schema(_) => "schema",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
            Self::RetriesExhausted { last, .. } => last.label(),
        }
    }

    /// Innermost error, unwrapping retry exhaustion.
    pub fn root(&self) -> &Self {
        match self {
            Self::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }

    pub fn is_throttling(&self) -> bool {
        matches!(self.root(), Self::Throttled { .. })
    }

    /// Server-provided wait hint for throttling errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self.root() {
            Self::Throttled { retry_after_secs } => retry_after_secs.map(Duration::from_secs),
            _ => None,
        }
    }

    /// Whether a single API call should be retried with backoff.
    ///
    /// Throttling, network, timeout and server-side (5xx) failures qualify.
    /// Client errors, schema mismatches and missing records do not.
    pub fn is_retryable_call(&self) -> bool {
        match self.root() {
            Self::Throttled { .. } | Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether a whole extraction run is worth repeating after a cool-down.
    ///
    /// Matches on the variant first, then on well-known message fragments so
    /// that wrapped driver errors are still recognised.
    pub fn is_transient(&self) -> bool {
        let root = self.root();
        if matches!(root, Self::Throttled { .. } | Self::Network(_) | Self::Timeout(_)) {
            return true;
        }
        let message = root.to_string().to_lowercase();
        TRANSIENT_MARKERS.iter().any(|marker| message.contains(marker))
    }

    /// Reporting category for the error.
    pub fn category(&self) -> ErrorCategory {
        match self.root() {
            Self::Network(_)
            | Self::Timeout(_)
            | Self::Throttled { .. }
            | Self::NotFound(_)
            | Self::Api { .. } => ErrorCategory::Api,
            Self::Database(_) => ErrorCategory::Database,
            Self::Schema(_) | Self::InvalidInput(_) => ErrorCategory::Processing,
            Self::Config(_) | Self::Internal(_) | Self::RetriesExhausted { .. } => {
                ErrorCategory::System
            }
        }
    }

    /// Alert level used when reporting the error.
    pub fn alert_level(&self) -> AlertLevel {
        match self.root() {
            Self::Database(_) | Self::Network(_) => AlertLevel::Critical,
            Self::Api { status: 401 | 403, .. } => AlertLevel::Critical,
            Self::Throttled { .. } | Self::Timeout(_) | Self::Api { .. } => AlertLevel::Warning,
            Self::NotFound(_) => AlertLevel::Info,
            _ => AlertLevel::Error,
        }
    }
}

impl From<serde_json::Error> for OrderFlowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Schema(err.to_string())
    }
}

/// Result type alias for OrderFlow operations
pub type Result<T> = std::result::Result<T, OrderFlowError>;
