//! HTTP contract tests for `MarketplaceClient` against a mock server.

use chrono::{TimeZone, Utc};
use orderflow_core::MarketplaceApi;
use orderflow_domain::{ApiConfig, OrderFlowError, OrderQuery, OrderStatus, SalesInterval};
use orderflow_infra::MarketplaceClient;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MARKET_DE: &str = "A1PA6795UKMFR9";

fn client_for(server: &MockServer) -> MarketplaceClient {
    let config = ApiConfig {
        base_url: format!("{}/", server.uri()),
        access_token: Some("token-abc".to_string()),
        timeout_secs: 5,
    };
    MarketplaceClient::new(&config).expect("client should build")
}

fn query() -> OrderQuery {
    OrderQuery {
        marketplace_id: MARKET_DE.to_string(),
        created_after: Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap(),
        created_before: Utc.with_ymd_and_hms(2024, 6, 4, 0, 0, 0).unwrap(),
    }
}

fn order_json(id: &str, status: &str) -> serde_json::Value {
    json!({
        "AmazonOrderId": id,
        "MarketplaceId": MARKET_DE,
        "OrderStatus": status,
        "PurchaseDate": "2024-06-03T09:00:00Z",
        "LastUpdateDate": "2024-06-03T10:00:00Z",
        "OrderTotal": { "CurrencyCode": "EUR", "Amount": "19.99" }
    })
}

/// Validates `MarketplaceClient::get_orders_page` request and response
/// mapping.
///
/// Assertions:
/// - Confirms the market, cursor and access token are sent.
/// - Confirms orders and the next cursor are decoded.
#[tokio::test]
async fn orders_page_sends_cursor_and_decodes_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/v0/orders"))
        .and(query_param("MarketplaceIds", MARKET_DE))
        .and(query_param("NextToken", "page-2"))
        .and(header("x-amz-access-token", "token-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "payload": {
                "Orders": [order_json("302-1", "Unshipped"), order_json("302-2", "Shipped")],
                "NextToken": "page-3"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server).get_orders_page(&query(), Some("page-2")).await.expect("page");

    assert_eq!(page.orders.len(), 2);
    assert_eq!(page.orders[0].status, OrderStatus::Unshipped);
    assert_eq!(page.orders[1].order_total.as_ref().map(|m| m.amount), Some(19.99));
    assert_eq!(page.next_cursor.as_deref(), Some("page-3"));
}

/// Validates that an empty `NextToken` ends pagination.
///
/// Assertions:
/// - Confirms the cursor is `None`.
#[tokio::test]
async fn empty_next_token_ends_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/v0/orders"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "payload": { "Orders": [], "NextToken": "" } })),
        )
        .mount(&server)
        .await;

    let page = client_for(&server).get_orders_page(&query(), None).await.expect("page");
    assert!(page.orders.is_empty());
    assert!(page.next_cursor.is_none());
}

/// Validates 429 mapping with a `Retry-After` hint.
///
/// Assertions:
/// - Confirms the error is `Throttled` carrying the hint in seconds.
#[tokio::test]
async fn too_many_requests_maps_to_throttled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/v0/orders/302-1/orderItems"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_order_items("302-1").await.unwrap_err();
    assert_eq!(err, OrderFlowError::Throttled { retry_after_secs: Some(7) });
    assert!(err.is_throttling());
}

/// Validates 404 mapping for a single order lookup.
///
/// Assertions:
/// - Confirms the error is `NotFound` with the remote message.
#[tokio::test]
async fn missing_order_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/v0/orders/302-404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{ "code": "NotFound", "message": "order 302-404 not found" }]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).get_order("302-404").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::NotFound(msg) if msg.contains("302-404")));
}

/// Validates order ids are sent as a single encoded path segment.
///
/// Assertions:
/// - Confirms reserved characters in the id do not add path segments.
/// - Confirms a base URL path prefix is kept.
#[tokio::test]
async fn order_id_is_encoded_as_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sp/orders/v0/orders/302%2F1%3Fx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "payload": order_json("302/1?x", "Pending")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ApiConfig {
        base_url: format!("{}/sp/", server.uri()),
        access_token: None,
        timeout_secs: 5,
    };
    let client = MarketplaceClient::new(&config).expect("client should build");

    let order = client.get_order("302/1?x").await.expect("order");
    assert_eq!(order.order_id, "302/1?x");
}

/// Validates `MarketplaceClient::new` rejects unusable base URLs.
///
/// Assertions:
/// - Confirms a relative URL and a non-hierarchical URL are config errors.
#[test]
fn invalid_base_url_is_a_config_error() {
    for base_url in ["not a url", "mailto:orders@example.com"] {
        let config =
            ApiConfig { base_url: base_url.to_string(), access_token: None, timeout_secs: 5 };
        let result = MarketplaceClient::new(&config);
        assert!(matches!(result, Err(OrderFlowError::Config(_))), "{base_url} was accepted");
    }
}

/// Validates server errors keep their status and summary.
///
/// Assertions:
/// - Confirms a 500 maps to `Api` and is retried per call.
#[tokio::test]
async fn server_error_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/v0/orders/302-1"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "errors": [{ "code": "InternalFailure", "message": "boom" }]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).get_order("302-1").await.unwrap_err();
    assert_eq!(
        err,
        OrderFlowError::Api { status: 500, message: "InternalFailure: boom".to_string() }
    );
    assert!(err.is_retryable_call());
}

/// Validates undecodable bodies surface as schema errors.
///
/// Assertions:
/// - Confirms a payload missing required fields is a `Schema` error.
#[tokio::test]
async fn malformed_payload_is_a_schema_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/v0/orders/302-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "payload": { "Unexpected": 1 } })),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).get_order("302-1").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Schema(_)), "unexpected error: {err:?}");
}

/// Validates the sales metrics request shape and decoding.
///
/// Assertions:
/// - Confirms product filters are sent as query parameters.
/// - Confirms the metric carries the requested interval.
#[tokio::test]
async fn sales_metrics_are_scoped_to_product_and_interval() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sales/v1/orderMetrics"))
        .and(query_param("asin", "B0C1234567"))
        .and(query_param("sku", "SKU-1"))
        .and(query_param("granularity", "Total"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "payload": [{
                "unitCount": 4,
                "orderCount": 3,
                "totalSales": { "currencyCode": "EUR", "amount": "79.96" }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let interval = SalesInterval {
        start: Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2024, 6, 4, 0, 0, 0).unwrap(),
    };
    let metrics = client_for(&server)
        .get_sales_metrics("B0C1234567", "SKU-1", MARKET_DE, &interval)
        .await
        .expect("metrics");

    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].units_ordered, 4);
    assert_eq!(metrics[0].interval_start, interval.start);
    assert_eq!(metrics[0].total_sales.as_ref().map(|m| m.amount), Some(79.96));
}
