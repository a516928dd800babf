//! # OrderFlow Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits)
//! - Extraction strategies and the run orchestrator
//! - Rate-limited, retrying wrappers for the marketplace API
//!
//! ## Architecture Principles
//! - Only depends on `orderflow-common` and `orderflow-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod extraction;

pub use extraction::{orchestrator, ports};
pub use extraction::{
    fetch_orders_in_window, guarded_call, rate_limiter_config, retry_config, ApiRetryPolicy,
    CatchUpPlan, ErrorReporter, ExtractionOrchestrator, ExtractionStrategy, MarketplaceApi,
    MetricsSink, Notifier, OrchestratorPorts, OrchestratorSettings, OrderStore,
    RateLimitedMarketplace, RunPhase, RunSummary, StrategySettings, StrategyTable,
};
