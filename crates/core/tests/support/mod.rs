//! Shared test helpers for `orderflow-core` integration tests.
//!
//! These helpers provide fixtures and in-memory mocks for every extraction
//! port so that tests can focus on behaviour instead of boilerplate.

#![allow(dead_code, unused_imports)]

pub mod marketplace;
pub mod sinks;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use orderflow_core::{
    ExtractionOrchestrator, OrchestratorPorts, OrchestratorSettings, StrategySettings,
};
use orderflow_domain::{ExtractType, ExtractionConfig, OrderItem, OrderRecord, OrderStatus};

pub use marketplace::MockMarketplace;
pub use sinks::{RecordingMetrics, RecordingNotifier, RecordingReporter};
pub use store::MockOrderStore;

pub const MARKET_DE: &str = "A1PA6795UKMFR9";
pub const MARKET_FR: &str = "A13V1IB3VIYZZH";

/// Fixed reference instant so fixtures stay deterministic.
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

pub fn order(id: &str, status: OrderStatus) -> OrderRecord {
    order_in(id, MARKET_DE, status)
}

pub fn order_in(id: &str, market: &str, status: OrderStatus) -> OrderRecord {
    OrderRecord {
        order_id: id.into(),
        marketplace_id: market.into(),
        status,
        purchase_date: at(3, 9),
        last_update_date: at(3, 10),
        sales_channel: Some("Amazon.de".into()),
        order_total: None,
        items_shipped: 0,
        items_unshipped: 1,
    }
}

pub fn item(order_id: &str, asin: &str, sku: &str) -> OrderItem {
    OrderItem {
        order_id: order_id.into(),
        order_item_id: format!("{order_id}-{asin}"),
        asin: asin.into(),
        seller_sku: sku.into(),
        quantity_ordered: 1,
        quantity_shipped: 0,
        item_price: None,
    }
}

pub fn config(extract_type: ExtractType, batch_size: usize) -> ExtractionConfig {
    ExtractionConfig::new(extract_type, at(3, 0), at(4, 0), [MARKET_DE], batch_size).unwrap()
}

/// Every port of an orchestrator, kept as concrete mocks for inspection.
pub struct Harness {
    pub api: Arc<MockMarketplace>,
    pub store: Arc<MockOrderStore>,
    pub metrics: Arc<RecordingMetrics>,
    pub reporter: Arc<RecordingReporter>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(api: MockMarketplace, store: MockOrderStore) -> Self {
        Self {
            api: Arc::new(api),
            store: Arc::new(store),
            metrics: Arc::new(RecordingMetrics::default()),
            reporter: Arc::new(RecordingReporter::default()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn ports(&self) -> OrchestratorPorts {
        OrchestratorPorts {
            api: self.api.clone(),
            store: self.store.clone(),
            metrics: self.metrics.clone(),
            reporter: self.reporter.clone(),
            notifier: self.notifier.clone(),
        }
    }

    pub fn orchestrator(&self) -> ExtractionOrchestrator {
        let settings = OrchestratorSettings {
            retry_cooldown: Duration::from_secs(30),
            inter_batch_pause: Duration::from_secs(1),
            fanout_concurrency: 4,
        };
        ExtractionOrchestrator::build(self.ports(), StrategySettings::default(), settings)
            .expect("store is supplied")
    }
}
