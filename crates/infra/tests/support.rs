#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use orderflow_domain::{Money, OrderItem, OrderRecord, OrderStatus, SalesMetric};
use orderflow_infra::database::{DbManager, SqliteOrderStore};
use tempfile::TempDir;

pub const MARKET_DE: &str = "A1PA6795UKMFR9";

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new migrated database in a fresh temp directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("orders.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    pub fn store(&self) -> SqliteOrderStore {
        SqliteOrderStore::new(Arc::clone(&self.manager))
    }

    /// Execute a batch of SQL statements against the database.
    pub fn execute_batch(&self, sql: &str) {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.execute_batch(sql).expect("SQL batch execution should succeed");
    }

    pub fn count(&self, table: &str) -> i64 {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .expect("count query should succeed")
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).single().expect("valid timestamp")
}

pub fn order(id: &str, status: OrderStatus) -> OrderRecord {
    OrderRecord {
        order_id: id.to_string(),
        marketplace_id: MARKET_DE.to_string(),
        status,
        purchase_date: at(3, 9),
        last_update_date: at(3, 10),
        sales_channel: Some("Amazon.de".to_string()),
        order_total: Some(Money { amount: 49.9, currency_code: "EUR".to_string() }),
        items_shipped: 0,
        items_unshipped: 1,
    }
}

pub fn item(order_id: &str, item_id: &str) -> OrderItem {
    OrderItem {
        order_id: order_id.to_string(),
        order_item_id: item_id.to_string(),
        asin: "B0C1234567".to_string(),
        seller_sku: "SKU-1".to_string(),
        quantity_ordered: 1,
        quantity_shipped: 0,
        item_price: None,
    }
}

pub fn sales_metric(units: u32) -> SalesMetric {
    SalesMetric {
        asin: "B0C1234567".to_string(),
        sku: "SKU-1".to_string(),
        marketplace_id: MARKET_DE.to_string(),
        interval_start: at(3, 0),
        interval_end: at(4, 0),
        units_ordered: units,
        order_count: units,
        total_sales: Some(Money { amount: 19.99 * f64::from(units), currency_code: "EUR".into() }),
    }
}
