//! Weekly reconciliation of stale pending orders against the marketplace

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Duration;
use orderflow_domain::{ExtractionConfig, OrderFlowError, OrderRecord, OrderStatus, Result};
use tracing::{debug, info, instrument, warn};

use crate::extraction::paging::fetch_orders_in_window;
use crate::extraction::ports::{MarketplaceApi, OrderStore};

/// Partition of remote orders against stale local ones
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatchUpPlan {
    /// Local rows to delete before reinsertion
    pub delete_ids: Vec<String>,
    /// Remote versions of orders that changed on both sides
    pub reinsert: Vec<OrderRecord>,
    /// Remote orders with no stale local counterpart
    pub inserts: Vec<OrderRecord>,
    pub unchanged: usize,
}

impl CatchUpPlan {
    pub fn build(stale: &[OrderRecord], remote: Vec<OrderRecord>) -> Self {
        let local: HashMap<&str, &OrderRecord> =
            stale.iter().map(|order| (order.order_id.as_str(), order)).collect();
        let mut plan = Self::default();

        for order in remote {
            match local.get(order.order_id.as_str()) {
                Some(existing) if existing.differs_from(&order) => {
                    plan.delete_ids.push(order.order_id.clone());
                    plan.reinsert.push(order);
                }
                Some(_) => plan.unchanged += 1,
                None => plan.inserts.push(order),
            }
        }

        plan
    }

    /// Records to hand back for persistence: reinserts then new inserts.
    pub fn into_records(self) -> Vec<OrderRecord> {
        let mut records = self.reinsert;
        records.extend(self.inserts);
        records
    }
}

#[derive(Clone)]
pub struct WeeklyCatchUpExtraction {
    api: Arc<dyn MarketplaceApi>,
    store: Arc<dyn OrderStore>,
    stale_after: Duration,
}

impl WeeklyCatchUpExtraction {
    /// Fails with `OrderFlowError::Config` when no store is supplied.
    pub fn new(
        api: Arc<dyn MarketplaceApi>,
        store: Option<Arc<dyn OrderStore>>,
        stale_after: Duration,
    ) -> Result<Self> {
        let store = store.ok_or_else(|| {
            OrderFlowError::Config("weekly_catchup extraction requires an order store".into())
        })?;
        Ok(Self { api, store, stale_after })
    }

    /// Delete changed rows, then return everything that must be (re)inserted.
    ///
    /// Stale orders outside the config window are fetched one by one; a stale
    /// order is always older than a default-sized window. Remote orders
    /// already stored but not stale show up as inserts; the downstream upsert
    /// makes that harmless.
    #[instrument(skip(self, config), fields(stale_after_days = self.stale_after.num_days()))]
    pub async fn extract(&self, config: &ExtractionConfig) -> Result<Vec<OrderRecord>> {
        let stale: Vec<OrderRecord> = self
            .store
            .get_stale_orders(self.stale_after)
            .await?
            .into_iter()
            .filter(|order| order.status == OrderStatus::Pending)
            .collect();

        let mut remote = fetch_orders_in_window(
            self.api.as_ref(),
            config.markets(),
            config.date_from(),
            config.date_to(),
        )
        .await?;
        let missing = self.fetch_missing(&stale, &remote).await?;
        remote.extend(missing);

        let plan = CatchUpPlan::build(&stale, remote);
        info!(
            stale = stale.len(),
            changed = plan.delete_ids.len(),
            new = plan.inserts.len(),
            unchanged = plan.unchanged,
            "strategy.weekly_catch_up.planned"
        );

        if !plan.delete_ids.is_empty() {
            let deleted = self.store.delete_orders(&plan.delete_ids).await?;
            info!(deleted, "strategy.weekly_catch_up.deleted");
        }

        Ok(plan.into_records())
    }

    /// Remote view of every stale order the window fetch did not return.
    async fn fetch_missing(
        &self,
        stale: &[OrderRecord],
        fetched: &[OrderRecord],
    ) -> Result<Vec<OrderRecord>> {
        let seen: HashSet<&str> = fetched.iter().map(|order| order.order_id.as_str()).collect();
        let mut found = Vec::new();

        for order in stale.iter().filter(|order| !seen.contains(order.order_id.as_str())) {
            match self.api.get_order(&order.order_id).await {
                Ok(remote) => found.push(remote),
                Err(err) if matches!(err.root(), OrderFlowError::NotFound(_)) => {
                    warn!(order_id = %order.order_id, "strategy.weekly_catch_up.remote_missing");
                }
                Err(err) => return Err(err),
            }
        }

        debug!(looked_up = found.len(), "strategy.weekly_catch_up.fetched_stale");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn order(id: &str, status: OrderStatus) -> OrderRecord {
        let at = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();
        OrderRecord {
            order_id: id.into(),
            marketplace_id: "A1PA6795UKMFR9".into(),
            status,
            purchase_date: at,
            last_update_date: at,
            sales_channel: None,
            order_total: None,
            items_shipped: 0,
            items_unshipped: 1,
        }
    }

    /// Validates `CatchUpPlan::build` partitioning.
    ///
    /// Assertions:
    /// - Confirms an order changed on both sides is deleted and reinserted.
    /// - Confirms a remote-only order is only inserted.
    /// - Confirms an identical order is counted as unchanged.
    #[test]
    fn test_plan_partitions_remote_orders() {
        let stale = vec![order("A", OrderStatus::Pending), order("B", OrderStatus::Pending)];
        let remote = vec![
            order("A", OrderStatus::Pending),
            order("B", OrderStatus::Shipped),
            order("C", OrderStatus::Unshipped),
        ];

        let plan = CatchUpPlan::build(&stale, remote);

        assert_eq!(plan.delete_ids, vec!["B".to_string()]);
        assert_eq!(plan.reinsert.len(), 1);
        assert_eq!(plan.reinsert[0].status, OrderStatus::Shipped);
        assert_eq!(plan.inserts.iter().map(|o| o.order_id.as_str()).collect::<Vec<_>>(), ["C"]);
        assert_eq!(plan.unchanged, 1);

        let ids: Vec<String> = plan.into_records().into_iter().map(|o| o.order_id).collect();
        assert_eq!(ids, vec!["B".to_string(), "C".to_string()]);
    }
}
