//! Port interfaces for order extraction
//!
//! These traits define the boundaries between the extraction pipeline and
//! the marketplace API, the order store and the reporting sinks.

use async_trait::async_trait;
use chrono::Duration;
use orderflow_domain::{
    ErrorContext, ExtractionConfig, OrderFlowError, OrderItem, OrderPage, OrderQuery, OrderRecord,
    OrderStatus, Result, SalesInterval, SalesMetric,
};
use uuid::Uuid;

/// Paged, quota-limited marketplace API
///
/// Implementations report throttling as `OrderFlowError::Throttled` and a
/// missing order as `OrderFlowError::NotFound`.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Fetch one page of orders created inside the query window
    async fn get_orders_page(&self, query: &OrderQuery, cursor: Option<&str>)
        -> Result<OrderPage>;

    /// Fetch the current remote view of a single order
    async fn get_order(&self, order_id: &str) -> Result<OrderRecord>;

    /// Fetch the line items of an order
    async fn get_order_items(&self, order_id: &str) -> Result<Vec<OrderItem>>;

    /// Fetch aggregated sales for one product in one marketplace
    async fn get_sales_metrics(
        &self,
        asin: &str,
        sku: &str,
        marketplace_id: &str,
        interval: &SalesInterval,
    ) -> Result<Vec<SalesMetric>>;
}

/// Local persistence of extracted orders
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert or update orders by `order_id`. Idempotent.
    async fn upsert_orders(&self, orders: &[OrderRecord]) -> Result<usize>;

    async fn get_orders_by_status(&self, statuses: &[OrderStatus]) -> Result<Vec<OrderRecord>>;

    /// Orders whose last confirmed sync is older than `older_than`
    async fn get_stale_orders(&self, older_than: Duration) -> Result<Vec<OrderRecord>>;

    /// Delete orders (and their items) by id, returning the number removed
    async fn delete_orders(&self, order_ids: &[String]) -> Result<usize>;

    async fn upsert_order_items(&self, items: &[OrderItem]) -> Result<usize>;

    async fn upsert_sales_metrics(&self, metrics: &[SalesMetric]) -> Result<usize>;
}

/// Append-only run metrics
///
/// Failures are logged by the orchestrator and never abort a run.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn record_start(&self, run_id: Uuid, config: &ExtractionConfig) -> Result<()>;

    async fn record_success(
        &self,
        run_id: Uuid,
        config: &ExtractionConfig,
        order_count: usize,
    ) -> Result<()>;

    async fn record_error(
        &self,
        run_id: Uuid,
        config: &ExtractionConfig,
        error: &OrderFlowError,
    ) -> Result<()>;
}

/// Error alerting collaborator
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    /// Report an error. Must not fail.
    async fn handle(&self, error: &OrderFlowError, context: &ErrorContext);
}

/// Success notification collaborator
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_success(&self, config: &ExtractionConfig, order_count: usize) -> Result<()>;
}
