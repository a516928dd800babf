//! HTTP adapter for the marketplace orders and sales APIs

use async_trait::async_trait;
use orderflow_core::MarketplaceApi;
use orderflow_domain::{
    ApiConfig, OrderFlowError, OrderItem, OrderPage, OrderQuery, OrderRecord, Result,
    SalesInterval, SalesMetric,
};
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client as ReqwestClient, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::payload::{Envelope, ErrorBody, OrderDto, OrderItemsDto, OrdersPageDto, SalesMetricDto};
use crate::errors::to_domain;

const ACCESS_TOKEN_HEADER: &str = "x-amz-access-token";
const USER_AGENT: &str = concat!("orderflow/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY: usize = 512;

/// Plain HTTP implementation of [`MarketplaceApi`].
///
/// No rate limiting or retries happen here; wrap it in
/// `RateLimitedMarketplace` for that.
#[derive(Clone)]
pub struct MarketplaceClient {
    client: ReqwestClient,
    base_url: Url,
}

impl MarketplaceClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.access_token.as_deref() {
            let value = HeaderValue::from_str(token)
                .map_err(|_| OrderFlowError::Config("access token is not a valid header".into()))?;
            headers.insert(ACCESS_TOKEN_HEADER, value);
        }

        let client = ReqwestClient::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(to_domain)?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            OrderFlowError::Config(format!("invalid api base url {}: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(OrderFlowError::Config(format!(
                "api base url {} cannot carry a path",
                config.base_url
            )));
        }

        Ok(Self { client, base_url })
    }

    /// Base URL with `segments` appended, each percent-encoded. `new` rejects
    /// bases that cannot carry a path.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(segments);
        debug!(%url, "marketplace.http.request");

        let response = self.client.get(url).query(query).send().await.map_err(to_domain)?;
        let response = check_status(response).await?;
        let envelope: Envelope<T> = response.json().await.map_err(to_domain)?;
        Ok(envelope.payload)
    }
}

/// Map non-success statuses onto the domain error taxonomy.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        return Err(OrderFlowError::Throttled { retry_after_secs });
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.summary())
        .unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY).collect());

    Err(match status {
        StatusCode::NOT_FOUND => OrderFlowError::NotFound(message),
        _ => OrderFlowError::Api { status: status.as_u16(), message },
    })
}

#[async_trait]
impl MarketplaceApi for MarketplaceClient {
    #[instrument(skip(self, query), fields(market = %query.marketplace_id))]
    async fn get_orders_page(
        &self,
        query: &OrderQuery,
        cursor: Option<&str>,
    ) -> Result<OrderPage> {
        let mut params = vec![
            ("MarketplaceIds", query.marketplace_id.clone()),
            ("CreatedAfter", query.created_after.to_rfc3339()),
            ("CreatedBefore", query.created_before.to_rfc3339()),
        ];
        if let Some(token) = cursor {
            params.push(("NextToken", token.to_string()));
        }

        let page: OrdersPageDto = self.get_json(&["orders", "v0", "orders"], &params).await?;
        let orders =
            page.orders.into_iter().map(OrderDto::into_record).collect::<Result<Vec<_>>>()?;

        Ok(OrderPage { orders, next_cursor: page.next_token.filter(|t| !t.is_empty()) })
    }

    async fn get_order(&self, order_id: &str) -> Result<OrderRecord> {
        let order: OrderDto = self.get_json(&["orders", "v0", "orders", order_id], &[]).await?;
        order.into_record()
    }

    async fn get_order_items(&self, order_id: &str) -> Result<Vec<OrderItem>> {
        let items: OrderItemsDto = self
            .get_json(&["orders", "v0", "orders", order_id, "orderItems"], &[])
            .await?;
        items.order_items.into_iter().map(|item| item.into_item(order_id)).collect()
    }

    async fn get_sales_metrics(
        &self,
        asin: &str,
        sku: &str,
        marketplace_id: &str,
        interval: &SalesInterval,
    ) -> Result<Vec<SalesMetric>> {
        let window = format!("{}--{}", interval.start.to_rfc3339(), interval.end.to_rfc3339());
        let params = [
            ("marketplaceIds", marketplace_id.to_string()),
            ("interval", window),
            ("granularity", "Total".to_string()),
            ("asin", asin.to_string()),
            ("sku", sku.to_string()),
        ];
        let metrics: Vec<SalesMetricDto> =
            self.get_json(&["sales", "v1", "orderMetrics"], &params).await?;
        metrics
            .into_iter()
            .map(|metric| metric.into_metric(asin, sku, marketplace_id, interval))
            .collect()
    }
}
