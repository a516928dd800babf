//! In-memory `OrderStore`

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Duration;
use orderflow_core::OrderStore;
use orderflow_domain::{OrderFlowError, OrderItem, OrderRecord, OrderStatus, Result, SalesMetric};
use parking_lot::Mutex;

/// Keeps orders in a map and records every write for assertions.
///
/// `get_stale_orders` returns the seeded stale set regardless of age.
#[derive(Default)]
pub struct MockOrderStore {
    orders: Mutex<BTreeMap<String, OrderRecord>>,
    stale: Mutex<Vec<OrderRecord>>,
    upsert_batches: Mutex<Vec<Vec<String>>>,
    deleted: Mutex<Vec<String>>,
    items: Mutex<Vec<OrderItem>>,
    sales: Mutex<Vec<SalesMetric>>,
    upsert_failure: Mutex<Option<OrderFlowError>>,
}

impl MockOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(self, orders: Vec<OrderRecord>) -> Self {
        {
            let mut stored = self.orders.lock();
            for order in orders {
                stored.insert(order.order_id.clone(), order);
            }
        }
        self
    }

    pub fn with_stale(self, orders: Vec<OrderRecord>) -> Self {
        *self.stale.lock() = orders;
        self
    }

    pub fn fail_upserts(self, error: OrderFlowError) -> Self {
        *self.upsert_failure.lock() = Some(error);
        self
    }

    /// Order ids per `upsert_orders` call, in call order.
    pub fn upsert_batches(&self) -> Vec<Vec<String>> {
        self.upsert_batches.lock().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    pub fn items(&self) -> Vec<OrderItem> {
        self.items.lock().clone()
    }

    pub fn sales(&self) -> Vec<SalesMetric> {
        self.sales.lock().clone()
    }

    pub fn stored(&self, order_id: &str) -> Option<OrderRecord> {
        self.orders.lock().get(order_id).cloned()
    }
}

#[async_trait]
impl OrderStore for MockOrderStore {
    async fn upsert_orders(&self, orders: &[OrderRecord]) -> Result<usize> {
        if let Some(err) = self.upsert_failure.lock().clone() {
            return Err(err);
        }
        self.upsert_batches.lock().push(orders.iter().map(|o| o.order_id.clone()).collect());
        let mut stored = self.orders.lock();
        for order in orders {
            stored.insert(order.order_id.clone(), order.clone());
        }
        Ok(orders.len())
    }

    async fn get_orders_by_status(&self, statuses: &[OrderStatus]) -> Result<Vec<OrderRecord>> {
        Ok(self
            .orders
            .lock()
            .values()
            .filter(|order| statuses.contains(&order.status))
            .cloned()
            .collect())
    }

    async fn get_stale_orders(&self, _older_than: Duration) -> Result<Vec<OrderRecord>> {
        Ok(self.stale.lock().clone())
    }

    async fn delete_orders(&self, order_ids: &[String]) -> Result<usize> {
        let mut stored = self.orders.lock();
        let removed = order_ids.iter().filter(|id| stored.remove(id.as_str()).is_some()).count();
        self.deleted.lock().extend(order_ids.iter().cloned());
        Ok(removed)
    }

    async fn upsert_order_items(&self, items: &[OrderItem]) -> Result<usize> {
        self.items.lock().extend_from_slice(items);
        Ok(items.len())
    }

    async fn upsert_sales_metrics(&self, metrics: &[SalesMetric]) -> Result<usize> {
        self.sales.lock().extend_from_slice(metrics);
        Ok(metrics.len())
    }
}
