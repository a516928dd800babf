//! Error reporter that routes alerts into the log stream
//!
//! Critical and error alerts are always emitted. Warnings and info alerts
//! with the same category and message are emitted once per quiet period, so
//! a throttling storm does not flood the log.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use orderflow_core::ErrorReporter;
use orderflow_domain::{AlertLevel, ErrorCategory, ErrorContext, OrderFlowError};
use parking_lot::Mutex;
use tracing::{error, info, warn};

const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(300);

pub struct TracingErrorReporter {
    quiet_period: Duration,
    last_seen: Mutex<HashMap<(ErrorCategory, String), Instant>>,
}

impl TracingErrorReporter {
    pub fn new() -> Self {
        Self::with_quiet_period(DEFAULT_QUIET_PERIOD)
    }

    pub fn with_quiet_period(quiet_period: Duration) -> Self {
        Self { quiet_period, last_seen: Mutex::new(HashMap::new()) }
    }

    /// Whether an alert of this level and message should be emitted now.
    fn should_emit(&self, context: &ErrorContext) -> bool {
        if context.level >= AlertLevel::Error {
            return true;
        }
        let key = (context.category, context.error.clone());
        let now = Instant::now();
        let mut last_seen = self.last_seen.lock();
        match last_seen.get(&key) {
            Some(seen) if now.duration_since(*seen) < self.quiet_period => false,
            _ => {
                let quiet_period = self.quiet_period;
                last_seen.retain(|_, seen| now.duration_since(*seen) < quiet_period);
                last_seen.insert(key, now);
                true
            }
        }
    }
}

impl Default for TracingErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ErrorReporter for TracingErrorReporter {
    async fn handle(&self, err: &OrderFlowError, context: &ErrorContext) {
        if !self.should_emit(context) {
            return;
        }

        let market = context.market_id.as_deref().unwrap_or("-");
        let order = context.order_id.as_deref().unwrap_or("-");
        let mode = context.process_mode.as_str();
        let category = context.category;
        let kind = err.label();

        match context.level {
            AlertLevel::Critical => error!(
                %category, kind, mode, market, order, error = %context.error,
                alert = "critical", "error_reporter.alert"
            ),
            AlertLevel::Error => error!(
                %category, kind, mode, market, order, error = %context.error,
                "error_reporter.alert"
            ),
            AlertLevel::Warning => warn!(
                %category, kind, mode, market, order, error = %context.error,
                "error_reporter.alert"
            ),
            AlertLevel::Info => info!(
                %category, kind, mode, market, order, error = %context.error,
                "error_reporter.alert"
            ),
        }
    }
}
