//! Run metrics events and error reporting context

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extraction::{ExtractType, ExtractionConfig};
use crate::errors::OrderFlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsEventKind {
    ProcessStart,
    ProcessSuccess,
    ProcessError,
}

/// One append-only metrics entry for an extraction run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsEvent {
    pub event: MetricsEventKind,
    pub run_id: Uuid,
    pub process_type: ExtractType,
    pub timestamp: DateTime<Utc>,
    pub date_from: DateTime<Utc>,
    pub date_to: DateTime<Utc>,
    pub markets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetricsEvent {
    fn base(kind: MetricsEventKind, run_id: Uuid, config: &ExtractionConfig) -> Self {
        Self {
            event: kind,
            run_id,
            process_type: config.extract_type(),
            timestamp: Utc::now(),
            date_from: config.date_from(),
            date_to: config.date_to(),
            markets: config.markets().to_vec(),
            order_count: None,
            error: None,
        }
    }

    pub fn start(run_id: Uuid, config: &ExtractionConfig) -> Self {
        Self::base(MetricsEventKind::ProcessStart, run_id, config)
    }

    pub fn success(run_id: Uuid, config: &ExtractionConfig, order_count: usize) -> Self {
        Self {
            order_count: Some(order_count),
            ..Self::base(MetricsEventKind::ProcessSuccess, run_id, config)
        }
    }

    pub fn error(run_id: Uuid, config: &ExtractionConfig, error: &OrderFlowError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::base(MetricsEventKind::ProcessError, run_id, config)
        }
    }
}

/// Broad origin of an error, used to route alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Api,
    Database,
    Processing,
    System,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Api => "api",
            Self::Database => "database",
            Self::Processing => "processing",
            Self::System => "system",
        })
    }
}

/// Severity of a reported error, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        })
    }
}

/// Where and when an error happened, handed to the error reporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub process_mode: ExtractType,
    pub market_id: Option<String>,
    pub order_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub category: ErrorCategory,
    pub level: AlertLevel,
    pub error: String,
}

impl ErrorContext {
    pub fn new(process_mode: ExtractType, error: &OrderFlowError) -> Self {
        Self {
            process_mode,
            market_id: None,
            order_id: None,
            timestamp: Utc::now(),
            category: error.category(),
            level: error.alert_level(),
            error: error.to_string(),
        }
    }

    #[must_use]
    pub fn with_market(mut self, market_id: impl Into<String>) -> Self {
        self.market_id = Some(market_id.into());
        self
    }

    #[must_use]
    pub fn with_order(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }
}
