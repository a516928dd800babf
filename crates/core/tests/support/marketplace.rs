//! Scripted in-memory `MarketplaceApi`

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use orderflow_core::MarketplaceApi;
use orderflow_domain::{
    OrderFlowError, OrderItem, OrderPage, OrderQuery, OrderRecord, Result, SalesInterval,
    SalesMetric,
};
use parking_lot::Mutex;

type PageKey = (String, Option<String>);

/// In-memory marketplace.
///
/// Pages are keyed by `(marketplace, cursor)`; an unknown key yields an
/// empty last page. Queued failures are returned before any scripted
/// response for the matching call.
#[derive(Default)]
pub struct MockMarketplace {
    pages: Mutex<HashMap<PageKey, OrderPage>>,
    orders: Mutex<HashMap<String, OrderRecord>>,
    items: Mutex<HashMap<String, Vec<OrderItem>>>,
    item_failures: Mutex<HashMap<String, OrderFlowError>>,
    page_failures: Mutex<VecDeque<OrderFlowError>>,
    order_failures: Mutex<VecDeque<OrderFlowError>>,
    page_calls: Mutex<Vec<(OrderQuery, Option<String>)>>,
    order_calls: Mutex<Vec<String>>,
    item_calls: Mutex<Vec<String>>,
    sales_calls: Mutex<Vec<(String, String, String)>>,
}

impl MockMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-page search result for `market`.
    pub fn with_orders(self, market: &str, orders: Vec<OrderRecord>) -> Self {
        self.with_page(market, None, orders, None)
    }

    pub fn with_page(
        self,
        market: &str,
        cursor: Option<&str>,
        orders: Vec<OrderRecord>,
        next_cursor: Option<&str>,
    ) -> Self {
        self.pages.lock().insert(
            (market.to_string(), cursor.map(str::to_string)),
            OrderPage { orders, next_cursor: next_cursor.map(str::to_string) },
        );
        self
    }

    /// Remote view returned by `get_order`. Unknown ids are `NotFound`.
    pub fn with_remote_order(self, order: OrderRecord) -> Self {
        self.orders.lock().insert(order.order_id.clone(), order);
        self
    }

    pub fn with_items(self, order_id: &str, items: Vec<OrderItem>) -> Self {
        self.items.lock().insert(order_id.to_string(), items);
        self
    }

    pub fn with_item_failure(self, order_id: &str, error: OrderFlowError) -> Self {
        self.item_failures.lock().insert(order_id.to_string(), error);
        self
    }

    pub fn fail_pages(self, errors: impl IntoIterator<Item = OrderFlowError>) -> Self {
        self.page_failures.lock().extend(errors);
        self
    }

    pub fn fail_orders(self, errors: impl IntoIterator<Item = OrderFlowError>) -> Self {
        self.order_failures.lock().extend(errors);
        self
    }

    pub fn page_calls(&self) -> Vec<(OrderQuery, Option<String>)> {
        self.page_calls.lock().clone()
    }

    pub fn order_calls(&self) -> usize {
        self.order_calls.lock().len()
    }

    pub fn item_calls(&self) -> usize {
        self.item_calls.lock().len()
    }

    pub fn sales_calls(&self) -> Vec<(String, String, String)> {
        self.sales_calls.lock().clone()
    }
}

#[async_trait]
impl MarketplaceApi for MockMarketplace {
    async fn get_orders_page(
        &self,
        query: &OrderQuery,
        cursor: Option<&str>,
    ) -> Result<OrderPage> {
        self.page_calls.lock().push((query.clone(), cursor.map(str::to_string)));
        if let Some(err) = self.page_failures.lock().pop_front() {
            return Err(err);
        }
        let key = (query.marketplace_id.clone(), cursor.map(str::to_string));
        Ok(self.pages.lock().get(&key).cloned().unwrap_or_default())
    }

    async fn get_order(&self, order_id: &str) -> Result<OrderRecord> {
        self.order_calls.lock().push(order_id.to_string());
        if let Some(err) = self.order_failures.lock().pop_front() {
            return Err(err);
        }
        self.orders
            .lock()
            .get(order_id)
            .cloned()
            .ok_or_else(|| OrderFlowError::NotFound(format!("order {order_id}")))
    }

    async fn get_order_items(&self, order_id: &str) -> Result<Vec<OrderItem>> {
        self.item_calls.lock().push(order_id.to_string());
        if let Some(err) = self.item_failures.lock().get(order_id) {
            return Err(err.clone());
        }
        Ok(self.items.lock().get(order_id).cloned().unwrap_or_default())
    }

    async fn get_sales_metrics(
        &self,
        asin: &str,
        sku: &str,
        marketplace_id: &str,
        interval: &SalesInterval,
    ) -> Result<Vec<SalesMetric>> {
        self.sales_calls.lock().push((asin.into(), sku.into(), marketplace_id.into()));
        Ok(vec![SalesMetric {
            asin: asin.into(),
            sku: sku.into(),
            marketplace_id: marketplace_id.into(),
            interval_start: interval.start,
            interval_end: interval.end,
            units_ordered: 1,
            order_count: 1,
            total_sales: None,
        }])
    }
}
