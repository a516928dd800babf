//! Order extraction pipeline
//!
//! - [`ports`]: traits implemented by infrastructure adapters
//! - [`guarded`]: rate limiting and retry around marketplace calls
//! - [`strategies`]: what each run mode extracts
//! - [`orchestrator`]: batching, persistence and run-level retry

pub mod guarded;
pub mod orchestrator;
pub mod paging;
pub mod ports;
pub mod strategies;

pub use guarded::{
    guarded_call, rate_limiter_config, retry_config, ApiRetryPolicy, RateLimitedMarketplace,
};
pub use orchestrator::{
    ExtractionOrchestrator, OrchestratorPorts, OrchestratorSettings, RunPhase, RunSummary,
};
pub use paging::fetch_orders_in_window;
pub use ports::{ErrorReporter, MarketplaceApi, MetricsSink, Notifier, OrderStore};
pub use strategies::{CatchUpPlan, ExtractionStrategy, StrategySettings, StrategyTable};
