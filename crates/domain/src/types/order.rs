//! Order, order item and sales metric records
//!
//! These mirror what the marketplace returns after field mapping and are the
//! rows the order store persists.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marketplace order status
///
/// Unknown statuses are preserved verbatim in `Other` rather than rejected,
/// since the marketplace adds statuses without notice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    PendingAvailability,
    Unshipped,
    PartiallyShipped,
    Shipped,
    InvoiceUnconfirmed,
    Canceled,
    Unfulfillable,
    Other(String),
}

impl OrderStatus {
    /// Statuses that can still change and are re-checked by status updates.
    pub const NON_TERMINAL: [Self; 2] = [Self::Pending, Self::Unshipped];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::PendingAvailability => "PendingAvailability",
            Self::Unshipped => "Unshipped",
            Self::PartiallyShipped => "PartiallyShipped",
            Self::Shipped => "Shipped",
            Self::InvoiceUnconfirmed => "InvoiceUnconfirmed",
            Self::Canceled => "Canceled",
            Self::Unfulfillable => "Unfulfillable",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_non_terminal(&self) -> bool {
        Self::NON_TERMINAL.contains(self)
    }
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Pending" => Self::Pending,
            "PendingAvailability" => Self::PendingAvailability,
            "Unshipped" => Self::Unshipped,
            "PartiallyShipped" => Self::PartiallyShipped,
            "Shipped" => Self::Shipped,
            "InvoiceUnconfirmed" => Self::InvoiceUnconfirmed,
            "Canceled" => Self::Canceled,
            "Unfulfillable" => Self::Unfulfillable,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monetary amount in a single currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency_code: String,
}

/// A marketplace order, keyed by `order_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub marketplace_id: String,
    pub status: OrderStatus,
    pub purchase_date: DateTime<Utc>,
    pub last_update_date: DateTime<Utc>,
    pub sales_channel: Option<String>,
    pub order_total: Option<Money>,
    pub items_shipped: u32,
    pub items_unshipped: u32,
}

impl OrderRecord {
    /// True when status or last update timestamp disagree.
    ///
    /// This is the change signal used by status updates and catch-up
    /// reconciliation; other fields are not compared.
    pub fn differs_from(&self, other: &Self) -> bool {
        self.status != other.status || self.last_update_date != other.last_update_date
    }
}

/// A line item belonging to an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: String,
    pub order_item_id: String,
    pub asin: String,
    pub seller_sku: String,
    pub quantity_ordered: u32,
    pub quantity_shipped: u32,
    pub item_price: Option<Money>,
}

/// Aggregated sales for one `(asin, sku, marketplace)` over an interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesMetric {
    pub asin: String,
    pub sku: String,
    pub marketplace_id: String,
    pub interval_start: DateTime<Utc>,
    pub interval_end: DateTime<Utc>,
    pub units_ordered: u32,
    pub order_count: u32,
    pub total_sales: Option<Money>,
}

/// Half-open time interval `[start, end)` for sales lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Parameters for one paged order search in a single marketplace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQuery {
    pub marketplace_id: String,
    pub created_after: DateTime<Utc>,
    pub created_before: DateTime<Utc>,
}

/// One page of order search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<OrderRecord>,
    /// Opaque continuation token; `None` on the last page
    pub next_cursor: Option<String>,
}
