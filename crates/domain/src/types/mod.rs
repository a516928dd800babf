//! Domain types and models

pub mod endpoint;
pub mod extraction;
pub mod order;
pub mod reporting;

pub use endpoint::ApiEndpoint;
pub use extraction::{ExtractType, ExtractionConfig};
pub use order::{
    Money, OrderItem, OrderPage, OrderQuery, OrderRecord, OrderStatus, SalesInterval,
    SalesMetric,
};
pub use reporting::{AlertLevel, ErrorCategory, ErrorContext, MetricsEvent, MetricsEventKind};
