//! Full re-extraction of a day's orders

use std::sync::Arc;

use orderflow_domain::{ExtractionConfig, OrderRecord, Result};
use tracing::{info, instrument};

use crate::extraction::paging::fetch_orders_in_window;
use crate::extraction::ports::MarketplaceApi;

/// Fetches every order created inside the configured window, across all
/// markets. No comparison against stored state.
#[derive(Clone)]
pub struct DailyFullExtraction {
    api: Arc<dyn MarketplaceApi>,
}

impl DailyFullExtraction {
    pub fn new(api: Arc<dyn MarketplaceApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self, config), fields(markets = config.markets().len()))]
    pub async fn extract(&self, config: &ExtractionConfig) -> Result<Vec<OrderRecord>> {
        let orders = fetch_orders_in_window(
            self.api.as_ref(),
            config.markets(),
            config.date_from(),
            config.date_to(),
        )
        .await?;

        info!(count = orders.len(), "strategy.daily_full.fetched");
        Ok(orders)
    }
}
