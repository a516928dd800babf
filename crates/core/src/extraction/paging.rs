//! Cursor pagination over the order search endpoint

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use orderflow_domain::{OrderFlowError, OrderQuery, OrderRecord, Result};
use tracing::debug;

use super::ports::MarketplaceApi;

/// Fetch every order created in `[from, to)` for each market.
///
/// Pages are followed until the API stops returning a cursor. Orders seen
/// more than once (overlapping pages, duplicate markets) are kept once.
pub async fn fetch_orders_in_window(
    api: &dyn MarketplaceApi,
    markets: &[String],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<OrderRecord>> {
    let mut seen = HashSet::new();
    let mut orders = Vec::new();

    for market in markets {
        let query = OrderQuery {
            marketplace_id: market.clone(),
            created_after: from,
            created_before: to,
        };
        let mut cursor: Option<String> = None;
        let mut pages = 0_u32;

        loop {
            let page = api.get_orders_page(&query, cursor.as_deref()).await?;
            pages += 1;

            for order in page.orders {
                if seen.insert(order.order_id.clone()) {
                    orders.push(order);
                }
            }

            match page.next_cursor {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    return Err(OrderFlowError::Schema(format!(
                        "order search for {market} returned the same cursor twice"
                    )));
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(market = %market, pages, total = orders.len(), "extraction.paging.market_done");
    }

    Ok(orders)
}
