//! Marketplace API endpoint families
//!
//! Each family has its own request budget on the remote side, so the rate
//! limiter is keyed by this enum.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::OrderFlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiEndpoint {
    /// Paged order search
    Orders,
    /// Single order lookup
    Order,
    OrderItems,
    Sales,
    Offers,
    Reports,
}

impl ApiEndpoint {
    pub const ALL: [Self; 6] =
        [Self::Orders, Self::Order, Self::OrderItems, Self::Sales, Self::Offers, Self::Reports];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Order => "order",
            Self::OrderItems => "order_items",
            Self::Sales => "sales",
            Self::Offers => "offers",
            Self::Reports => "reports",
        }
    }
}

impl fmt::Display for ApiEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiEndpoint {
    type Err = OrderFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|endpoint| endpoint.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| OrderFlowError::InvalidInput(format!("unknown API endpoint '{s}'")))
    }
}
