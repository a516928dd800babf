//! Observability adapters
//!
//! Log initialisation plus the infra implementations of the metrics, error
//! reporting and notification ports.

pub mod error_reporter;
pub mod logging;
pub mod metrics_sink;
pub mod notifier;

pub use error_reporter::TracingErrorReporter;
pub use logging::{init_tracing, LogFormat};
pub use metrics_sink::JsonlMetricsSink;
pub use notifier::LogNotifier;
