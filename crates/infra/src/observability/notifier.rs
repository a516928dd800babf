//! Success notifier that writes a summary event to the log

use async_trait::async_trait;
use orderflow_core::Notifier;
use orderflow_domain::{ExtractionConfig, Result};
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_success(&self, config: &ExtractionConfig, order_count: usize) -> Result<()> {
        info!(
            mode = config.extract_type().as_str(),
            markets = %config.markets().join(","),
            date_from = %config.date_from(),
            date_to = %config.date_to(),
            order_count,
            "notifier.extraction_completed"
        );
        Ok(())
    }
}
