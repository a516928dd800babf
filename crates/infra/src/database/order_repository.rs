//! SQLite implementation of the `OrderStore` port
//!
//! Upserts are keyed on the natural id of each row and refresh `synced_at`,
//! which drives the staleness query used by the weekly reconciliation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use orderflow_core::OrderStore;
use orderflow_domain::{
    Money, OrderItem, OrderRecord, OrderStatus, Result as DomainResult, SalesMetric,
};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tokio::task;
use tracing::debug;

use super::manager::DbManager;
use crate::errors::to_domain;

const ORDER_COLUMNS: &str = "order_id, marketplace_id, status, purchase_date, last_update_date,
     sales_channel, order_total_amount, order_total_currency, items_shipped, items_unshipped";

/// Order store backed by the pooled SQLite database
pub struct SqliteOrderStore {
    db: Arc<DbManager>,
}

impl SqliteOrderStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Run `work` on a pooled connection off the async runtime.
    async fn with_connection<T, F>(&self, work: F) -> DomainResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> DomainResult<T> {
            let mut conn = db.get_connection()?;
            work(&mut *conn).map_err(to_domain)
        })
        .await
        .map_err(to_domain)?
    }

    /// Look up a single stored order.
    pub async fn find_order(&self, order_id: &str) -> DomainResult<Option<OrderRecord>> {
        let order_id = order_id.to_string();
        self.with_connection(move |conn| {
            let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ?1");
            conn.query_row(&sql, params![order_id], map_order_row).optional()
        })
        .await
    }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn upsert_orders(&self, orders: &[OrderRecord]) -> DomainResult<usize> {
        if orders.is_empty() {
            return Ok(0);
        }
        let orders = orders.to_vec();
        let written = self.with_connection(move |conn| upsert_orders(conn, &orders)).await?;
        debug!(written, "order_store.orders_upserted");
        Ok(written)
    }

    async fn get_orders_by_status(
        &self,
        statuses: &[OrderStatus],
    ) -> DomainResult<Vec<OrderRecord>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        self.with_connection(move |conn| {
            let placeholders = vec!["?"; statuses.len()].join(", ");
            let sql = format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE status IN ({placeholders}) ORDER BY order_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(statuses.iter()), map_order_row)?;
            rows.collect()
        })
        .await
    }

    async fn get_stale_orders(&self, older_than: Duration) -> DomainResult<Vec<OrderRecord>> {
        let cutoff = (Utc::now() - older_than).timestamp();
        self.with_connection(move |conn| {
            let sql = format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE synced_at < ?1 ORDER BY order_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![cutoff], map_order_row)?;
            rows.collect()
        })
        .await
    }

    async fn delete_orders(&self, order_ids: &[String]) -> DomainResult<usize> {
        if order_ids.is_empty() {
            return Ok(0);
        }
        let order_ids = order_ids.to_vec();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            let mut removed = 0;
            {
                let mut delete_items = tx.prepare("DELETE FROM order_items WHERE order_id = ?1")?;
                let mut delete_order = tx.prepare("DELETE FROM orders WHERE order_id = ?1")?;
                for id in &order_ids {
                    delete_items.execute(params![id])?;
                    removed += delete_order.execute(params![id])?;
                }
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
    }

    async fn upsert_order_items(&self, items: &[OrderItem]) -> DomainResult<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        let items = items.to_vec();
        self.with_connection(move |conn| upsert_items(conn, &items)).await
    }

    async fn upsert_sales_metrics(&self, metrics: &[SalesMetric]) -> DomainResult<usize> {
        if metrics.is_empty() {
            return Ok(0);
        }
        let metrics = metrics.to_vec();
        self.with_connection(move |conn| upsert_sales(conn, &metrics)).await
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn upsert_orders(conn: &mut Connection, orders: &[OrderRecord]) -> rusqlite::Result<usize> {
    let now = Utc::now().timestamp();
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO orders (order_id, marketplace_id, status, purchase_date, last_update_date,
                                 sales_channel, order_total_amount, order_total_currency,
                                 items_shipped, items_unshipped, synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(order_id) DO UPDATE SET
                 marketplace_id = excluded.marketplace_id,
                 status = excluded.status,
                 purchase_date = excluded.purchase_date,
                 last_update_date = excluded.last_update_date,
                 sales_channel = excluded.sales_channel,
                 order_total_amount = excluded.order_total_amount,
                 order_total_currency = excluded.order_total_currency,
                 items_shipped = excluded.items_shipped,
                 items_unshipped = excluded.items_unshipped,
                 synced_at = excluded.synced_at",
        )?;
        for order in orders {
            let (amount, currency) = split_money(order.order_total.as_ref());
            stmt.execute(params![
                order.order_id,
                order.marketplace_id,
                order.status.as_str(),
                order.purchase_date,
                order.last_update_date,
                order.sales_channel,
                amount,
                currency,
                order.items_shipped,
                order.items_unshipped,
                now,
            ])?;
        }
    }
    tx.commit()?;
    Ok(orders.len())
}

fn upsert_items(conn: &mut Connection, items: &[OrderItem]) -> rusqlite::Result<usize> {
    let now = Utc::now().timestamp();
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO order_items (order_id, order_item_id, asin, seller_sku, quantity_ordered,
                                      quantity_shipped, item_price_amount, item_price_currency,
                                      synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(order_id, order_item_id) DO UPDATE SET
                 asin = excluded.asin,
                 seller_sku = excluded.seller_sku,
                 quantity_ordered = excluded.quantity_ordered,
                 quantity_shipped = excluded.quantity_shipped,
                 item_price_amount = excluded.item_price_amount,
                 item_price_currency = excluded.item_price_currency,
                 synced_at = excluded.synced_at",
        )?;
        for item in items {
            let (amount, currency) = split_money(item.item_price.as_ref());
            stmt.execute(params![
                item.order_id,
                item.order_item_id,
                item.asin,
                item.seller_sku,
                item.quantity_ordered,
                item.quantity_shipped,
                amount,
                currency,
                now,
            ])?;
        }
    }
    tx.commit()?;
    Ok(items.len())
}

fn upsert_sales(conn: &mut Connection, metrics: &[SalesMetric]) -> rusqlite::Result<usize> {
    let now = Utc::now().timestamp();
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO sales_metrics (asin, sku, marketplace_id, interval_start, interval_end,
                                        units_ordered, order_count, total_sales_amount,
                                        total_sales_currency, synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(asin, sku, marketplace_id, interval_start, interval_end) DO UPDATE SET
                 units_ordered = excluded.units_ordered,
                 order_count = excluded.order_count,
                 total_sales_amount = excluded.total_sales_amount,
                 total_sales_currency = excluded.total_sales_currency,
                 synced_at = excluded.synced_at",
        )?;
        for metric in metrics {
            let (amount, currency) = split_money(metric.total_sales.as_ref());
            stmt.execute(params![
                metric.asin,
                metric.sku,
                metric.marketplace_id,
                metric.interval_start,
                metric.interval_end,
                metric.units_ordered,
                metric.order_count,
                amount,
                currency,
                now,
            ])?;
        }
    }
    tx.commit()?;
    Ok(metrics.len())
}

fn split_money(money: Option<&Money>) -> (Option<f64>, Option<&str>) {
    match money {
        Some(money) => (Some(money.amount), Some(money.currency_code.as_str())),
        None => (None, None),
    }
}

fn map_order_row(row: &Row<'_>) -> rusqlite::Result<OrderRecord> {
    let status: String = row.get(2)?;
    let amount: Option<f64> = row.get(6)?;
    let currency: Option<String> = row.get(7)?;
    let purchase_date: DateTime<Utc> = row.get(3)?;
    let last_update_date: DateTime<Utc> = row.get(4)?;

    Ok(OrderRecord {
        order_id: row.get(0)?,
        marketplace_id: row.get(1)?,
        status: OrderStatus::from(status),
        purchase_date,
        last_update_date,
        sales_channel: row.get(5)?,
        order_total: amount
            .zip(currency)
            .map(|(amount, currency_code)| Money { amount, currency_code }),
        items_shipped: row.get(8)?,
        items_unshipped: row.get(9)?,
    })
}
