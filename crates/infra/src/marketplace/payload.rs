//! Wire payloads of the marketplace REST API
//!
//! Field names follow the remote JSON (PascalCase for orders, camelCase for
//! sales). Monetary amounts arrive as decimal strings.

use chrono::{DateTime, Utc};
use orderflow_domain::{
    Money, OrderFlowError, OrderItem, OrderRecord, OrderStatus, Result, SalesInterval,
    SalesMetric,
};
use serde::Deserialize;

/// Every response wraps its body in `payload`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub payload: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MoneyDto {
    pub currency_code: String,
    pub amount: String,
}

impl MoneyDto {
    fn into_money(self) -> Result<Money> {
        let amount = self.amount.trim().parse::<f64>().map_err(|e| {
            OrderFlowError::Schema(format!("invalid amount '{}': {e}", self.amount))
        })?;
        Ok(Money { amount, currency_code: self.currency_code })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderDto {
    pub amazon_order_id: String,
    pub marketplace_id: String,
    pub order_status: String,
    pub purchase_date: DateTime<Utc>,
    pub last_update_date: DateTime<Utc>,
    #[serde(default)]
    pub sales_channel: Option<String>,
    #[serde(default)]
    pub order_total: Option<MoneyDto>,
    #[serde(default)]
    pub number_of_items_shipped: Option<u32>,
    #[serde(default)]
    pub number_of_items_unshipped: Option<u32>,
}

impl OrderDto {
    pub fn into_record(self) -> Result<OrderRecord> {
        Ok(OrderRecord {
            order_id: self.amazon_order_id,
            marketplace_id: self.marketplace_id,
            status: OrderStatus::from(self.order_status),
            purchase_date: self.purchase_date,
            last_update_date: self.last_update_date,
            sales_channel: self.sales_channel,
            order_total: self.order_total.map(MoneyDto::into_money).transpose()?,
            items_shipped: self.number_of_items_shipped.unwrap_or(0),
            items_unshipped: self.number_of_items_unshipped.unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrdersPageDto {
    #[serde(default)]
    pub orders: Vec<OrderDto>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderItemDto {
    pub order_item_id: String,
    #[serde(rename = "ASIN")]
    pub asin: String,
    #[serde(rename = "SellerSKU", default)]
    pub seller_sku: Option<String>,
    pub quantity_ordered: u32,
    #[serde(default)]
    pub quantity_shipped: Option<u32>,
    #[serde(default)]
    pub item_price: Option<MoneyDto>,
}

impl OrderItemDto {
    pub fn into_item(self, order_id: &str) -> Result<OrderItem> {
        Ok(OrderItem {
            order_id: order_id.to_string(),
            order_item_id: self.order_item_id,
            asin: self.asin,
            seller_sku: self.seller_sku.unwrap_or_default(),
            quantity_ordered: self.quantity_ordered,
            quantity_shipped: self.quantity_shipped.unwrap_or(0),
            item_price: self.item_price.map(MoneyDto::into_money).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderItemsDto {
    #[serde(default)]
    pub order_items: Vec<OrderItemDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesMoneyDto {
    pub currency_code: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesMetricDto {
    #[serde(default)]
    pub unit_count: u32,
    #[serde(default)]
    pub order_count: u32,
    #[serde(default)]
    pub total_sales: Option<SalesMoneyDto>,
}

impl SalesMetricDto {
    pub fn into_metric(
        self,
        asin: &str,
        sku: &str,
        marketplace_id: &str,
        interval: &SalesInterval,
    ) -> Result<SalesMetric> {
        let total_sales = self
            .total_sales
            .map(|money| MoneyDto { currency_code: money.currency_code, amount: money.amount })
            .map(MoneyDto::into_money)
            .transpose()?;
        Ok(SalesMetric {
            asin: asin.to_string(),
            sku: sku.to_string(),
            marketplace_id: marketplace_id.to_string(),
            interval_start: interval.start,
            interval_end: interval.end,
            units_ordered: self.unit_count,
            order_count: self.order_count,
            total_sales,
        })
    }
}

/// Error body returned with non-success statuses
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEntry {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ErrorBody {
    /// First error rendered as `code: message`, if any.
    pub fn summary(&self) -> Option<String> {
        self.errors.first().map(|e| format!("{}: {}", e.code, e.message))
    }
}
