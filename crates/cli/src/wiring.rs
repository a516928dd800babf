//! Assembles the production adapters into an orchestrator

use std::sync::Arc;

use anyhow::{Context, Result};
use orderflow_common::RateLimiter;
use orderflow_core::{
    rate_limiter_config, retry_config, ExtractionOrchestrator, MarketplaceApi, OrchestratorPorts,
    OrchestratorSettings, OrderStore, RateLimitedMarketplace, StrategySettings,
};
use orderflow_domain::AppConfig;
use orderflow_infra::{
    DbManager, JsonlMetricsSink, LogNotifier, MarketplaceClient, SqliteOrderStore,
    TracingErrorReporter,
};

/// Open the store, wrap the HTTP client in rate limiting and retry, and hand
/// every port to the orchestrator.
pub fn build_orchestrator(config: &AppConfig) -> Result<ExtractionOrchestrator> {
    let db = DbManager::new(&config.database.path, config.database.pool_size)
        .context("opening order database")?;
    db.run_migrations().context("applying database schema")?;
    let store: Arc<dyn OrderStore> = Arc::new(SqliteOrderStore::new(Arc::new(db)));

    let limiter = RateLimiter::new(rate_limiter_config(&config.rate_limits)?)
        .context("building rate limiter")?;
    let client: Arc<dyn MarketplaceApi> = Arc::new(MarketplaceClient::new(&config.api)?);
    let api: Arc<dyn MarketplaceApi> = Arc::new(RateLimitedMarketplace::new(
        client,
        Arc::new(limiter),
        retry_config(&config.retry)?,
    ));

    let ports = OrchestratorPorts {
        api,
        store,
        metrics: Arc::new(JsonlMetricsSink::new(&config.metrics.path)),
        reporter: Arc::new(TracingErrorReporter::new()),
        notifier: Arc::new(LogNotifier::new()),
    };

    let orchestrator = ExtractionOrchestrator::build(
        ports,
        StrategySettings::from(&config.extraction),
        OrchestratorSettings::from(&config.extraction),
    )?;
    Ok(orchestrator)
}
