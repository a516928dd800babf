//! Short-window extraction of recently created orders

use std::sync::Arc;

use chrono::Duration;
use orderflow_domain::{ExtractionConfig, OrderRecord, Result};
use tracing::{info, instrument};

use crate::extraction::paging::fetch_orders_in_window;
use crate::extraction::ports::MarketplaceApi;

/// Same fetch as the daily run, over at most `lookback` ending at the
/// config's `date_to`. Upserts downstream make overlap harmless.
#[derive(Clone)]
pub struct IncrementalExtraction {
    api: Arc<dyn MarketplaceApi>,
    lookback: Duration,
}

impl IncrementalExtraction {
    pub fn new(api: Arc<dyn MarketplaceApi>, lookback: Duration) -> Self {
        Self { api, lookback }
    }

    #[instrument(skip(self, config), fields(markets = config.markets().len()))]
    pub async fn extract(&self, config: &ExtractionConfig) -> Result<Vec<OrderRecord>> {
        let from = config.date_from().max(config.date_to() - self.lookback);
        let orders =
            fetch_orders_in_window(self.api.as_ref(), config.markets(), from, config.date_to())
                .await?;

        info!(count = orders.len(), from = %from, "strategy.incremental.fetched");
        Ok(orders)
    }
}
