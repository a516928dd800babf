//! Re-check stored orders that may still change status

use std::sync::Arc;

use orderflow_domain::{ExtractionConfig, OrderFlowError, OrderRecord, OrderStatus, Result};
use tracing::{debug, info, instrument, warn};

use crate::extraction::ports::{MarketplaceApi, OrderStore};

/// Returns the remote version of every non-terminal stored order whose
/// status or last update changed. Orders the marketplace no longer knows
/// are skipped.
#[derive(Clone)]
pub struct StatusUpdateExtraction {
    api: Arc<dyn MarketplaceApi>,
    store: Arc<dyn OrderStore>,
}

impl StatusUpdateExtraction {
    /// Fails with `OrderFlowError::Config` when no store is supplied.
    pub fn new(api: Arc<dyn MarketplaceApi>, store: Option<Arc<dyn OrderStore>>) -> Result<Self> {
        let store = store.ok_or_else(|| {
            OrderFlowError::Config("status_update extraction requires an order store".into())
        })?;
        Ok(Self { api, store })
    }

    #[instrument(skip(self, config), fields(extract_type = %config.extract_type()))]
    pub async fn extract(&self, config: &ExtractionConfig) -> Result<Vec<OrderRecord>> {
        let pending = self.store.get_orders_by_status(&OrderStatus::NON_TERMINAL).await?;
        debug!(candidates = pending.len(), "strategy.status_update.loaded");

        let mut changed = Vec::new();
        for stored in &pending {
            match self.api.get_order(&stored.order_id).await {
                Ok(remote) if remote.differs_from(stored) => {
                    debug!(
                        order_id = %stored.order_id,
                        from = %stored.status,
                        to = %remote.status,
                        "strategy.status_update.changed"
                    );
                    changed.push(remote);
                }
                Ok(_) => {}
                Err(err) if matches!(err.root(), OrderFlowError::NotFound(_)) => {
                    warn!(order_id = %stored.order_id, "strategy.status_update.remote_missing");
                }
                Err(err) => return Err(err),
            }
        }

        info!(checked = pending.len(), changed = changed.len(), "strategy.status_update.done");
        Ok(changed)
    }
}
