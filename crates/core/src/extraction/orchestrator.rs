//! Extraction run orchestration
//!
//! A run selects the strategy for its mode, extracts, then persists the
//! result in sequential batches. Orders in a batch get their line items and
//! sales metrics fetched with bounded concurrency (except status updates).
//! A failure of one order's detail fetch is reported and skipped. A
//! transient failure of the whole run triggers exactly one repeat after a
//! cool-down.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use orderflow_domain::constants::{
    DEFAULT_FANOUT_CONCURRENCY, DEFAULT_INTER_BATCH_PAUSE_MS, DEFAULT_RUN_RETRY_COOLDOWN_SECS,
};
use orderflow_domain::{
    ErrorContext, ExtractType, ExtractionConfig, ExtractionSettings, OrderFlowError, OrderItem,
    OrderRecord, Result, SalesInterval, SalesMetric,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn, Span};
use uuid::Uuid;

use super::ports::{ErrorReporter, MarketplaceApi, MetricsSink, Notifier, OrderStore};
use super::strategies::{StrategySettings, StrategyTable};

/// A run is attempted at most this many times.
pub const MAX_RUN_ATTEMPTS: u32 = 2;

/// Lifecycle of a single run, recorded on the `orchestrator.run` span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    Start,
    StrategySelected,
    Extracting,
    Empty,
    Batching,
    Persisting,
    Metrics,
    Done,
    Error,
    Retry,
    Failed,
}

impl RunPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::StrategySelected => "strategy_selected",
            Self::Extracting => "extracting",
            Self::Empty => "empty",
            Self::Batching => "batching",
            Self::Persisting => "persisting",
            Self::Metrics => "metrics",
            Self::Done => "done",
            Self::Error => "error",
            Self::Retry => "retry",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Wait before repeating a run that failed transiently
    pub retry_cooldown: Duration,
    /// Pause between consecutive batches
    pub inter_batch_pause: Duration,
    /// Concurrent detail fetches within a batch
    pub fanout_concurrency: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            retry_cooldown: Duration::from_secs(DEFAULT_RUN_RETRY_COOLDOWN_SECS),
            inter_batch_pause: Duration::from_millis(DEFAULT_INTER_BATCH_PAUSE_MS),
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
        }
    }
}

impl From<&ExtractionSettings> for OrchestratorSettings {
    fn from(settings: &ExtractionSettings) -> Self {
        Self {
            retry_cooldown: Duration::from_secs(settings.retry_cooldown_secs),
            inter_batch_pause: Duration::from_millis(settings.inter_batch_pause_ms),
            fanout_concurrency: settings.fanout_concurrency.max(1),
        }
    }
}

/// Collaborators used by a run
#[derive(Clone)]
pub struct OrchestratorPorts {
    pub api: Arc<dyn MarketplaceApi>,
    pub store: Arc<dyn OrderStore>,
    pub metrics: Arc<dyn MetricsSink>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub notifier: Arc<dyn Notifier>,
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub extract_type: ExtractType,
    /// Orders handed to the store
    pub records: usize,
    pub batches: usize,
    /// 1, or 2 when the run was repeated after a transient failure
    pub attempts: u32,
}

struct AttemptOutcome {
    records: usize,
    batches: usize,
}

pub struct ExtractionOrchestrator {
    strategies: StrategyTable,
    ports: OrchestratorPorts,
    settings: OrchestratorSettings,
    run_lock: Mutex<()>,
}

impl ExtractionOrchestrator {
    pub fn new(
        strategies: StrategyTable,
        ports: OrchestratorPorts,
        settings: OrchestratorSettings,
    ) -> Self {
        Self { strategies, ports, settings, run_lock: Mutex::new(()) }
    }

    /// Build the strategy table from the ports and wrap it.
    pub fn build(
        ports: OrchestratorPorts,
        strategy_settings: StrategySettings,
        settings: OrchestratorSettings,
    ) -> Result<Self> {
        let strategies =
            StrategyTable::new(ports.api.clone(), Some(ports.store.clone()), strategy_settings)?;
        Ok(Self::new(strategies, ports, settings))
    }

    pub const fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Run one extraction end to end.
    ///
    /// Calls on the same orchestrator are serialized.
    #[instrument(
        name = "orchestrator.run",
        skip(self, config),
        fields(
            extract_type = %config.extract_type(),
            run_id = tracing::field::Empty,
            phase = tracing::field::Empty,
        )
    )]
    pub async fn run(&self, config: &ExtractionConfig) -> Result<RunSummary> {
        let _serialized = self.run_lock.lock().await;
        let run_id = Uuid::now_v7();
        Span::current().record("run_id", tracing::field::display(run_id));

        let mut attempt = 1;
        loop {
            match self.attempt(run_id, config).await {
                Ok(outcome) => {
                    enter(RunPhase::Done);
                    info!(
                        records = outcome.records,
                        batches = outcome.batches,
                        attempt,
                        "orchestrator.run.complete"
                    );
                    return Ok(RunSummary {
                        run_id,
                        extract_type: config.extract_type(),
                        records: outcome.records,
                        batches: outcome.batches,
                        attempts: attempt,
                    });
                }
                Err(err) => {
                    enter(RunPhase::Error);
                    self.record_run_failure(run_id, config, &err).await;

                    if err.is_transient() && attempt < MAX_RUN_ATTEMPTS {
                        enter(RunPhase::Retry);
                        warn!(
                            error = %err,
                            attempt,
                            cooldown_secs = self.settings.retry_cooldown.as_secs(),
                            "orchestrator.run.retry_scheduled"
                        );
                        tokio::time::sleep(self.settings.retry_cooldown).await;
                        attempt += 1;
                        continue;
                    }

                    enter(RunPhase::Failed);
                    error!(error = %err, attempt, "orchestrator.run.failed");
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(&self, run_id: Uuid, config: &ExtractionConfig) -> Result<AttemptOutcome> {
        enter(RunPhase::Start);
        if let Err(err) = self.ports.metrics.record_start(run_id, config).await {
            warn!(error = %err, "orchestrator.metrics.start_failed");
        }

        let strategy = self.strategies.get(config.extract_type());
        enter(RunPhase::StrategySelected);

        enter(RunPhase::Extracting);
        let orders = strategy.extract(config).await?;

        if orders.is_empty() {
            enter(RunPhase::Empty);
            info!("orchestrator.run.nothing_to_persist");
            self.record_success(run_id, config, 0).await;
            return Ok(AttemptOutcome { records: 0, batches: 0 });
        }

        enter(RunPhase::Batching);
        let total = orders.len();
        let mut batches = 0;
        for (index, chunk) in orders.chunks(config.batch_size()).enumerate() {
            if index > 0 && !self.settings.inter_batch_pause.is_zero() {
                tokio::time::sleep(self.settings.inter_batch_pause).await;
            }
            enter(RunPhase::Persisting);
            self.persist_batch(config, chunk).await?;
            batches += 1;
            debug!(batch = index + 1, size = chunk.len(), "orchestrator.batch.persisted");
        }

        enter(RunPhase::Metrics);
        self.record_success(run_id, config, total).await;

        if config.extract_type() == ExtractType::DailyFull {
            if let Err(err) = self.ports.notifier.notify_success(config, total).await {
                warn!(error = %err, "orchestrator.notify.failed");
            }
        }

        Ok(AttemptOutcome { records: total, batches })
    }

    async fn persist_batch(&self, config: &ExtractionConfig, chunk: &[OrderRecord]) -> Result<()> {
        let upserted = self.ports.store.upsert_orders(chunk).await?;
        debug!(upserted, "orchestrator.batch.orders_upserted");

        if !config.extract_type().cascades_details() {
            return Ok(());
        }

        let items = self.fetch_items(config, chunk).await;
        if !items.is_empty() {
            self.ports.store.upsert_order_items(&items).await?;
        }

        let markets: HashMap<&str, &str> = chunk
            .iter()
            .map(|order| (order.order_id.as_str(), order.marketplace_id.as_str()))
            .collect();
        let metrics = self.fetch_sales(config, &items, &markets).await;
        if !metrics.is_empty() {
            self.ports.store.upsert_sales_metrics(&metrics).await?;
        }

        Ok(())
    }

    async fn fetch_items(
        &self,
        config: &ExtractionConfig,
        chunk: &[OrderRecord],
    ) -> Vec<OrderItem> {
        let api = &self.ports.api;
        let fetched: Vec<Vec<OrderItem>> = stream::iter(chunk)
            .map(|order| async move {
                match api.get_order_items(&order.order_id).await {
                    Ok(items) => items,
                    Err(err) => {
                        warn!(
                            order_id = %order.order_id,
                            error = %err,
                            "orchestrator.items.failed"
                        );
                        let context = ErrorContext::new(config.extract_type(), &err)
                            .with_market(&order.marketplace_id)
                            .with_order(&order.order_id);
                        self.ports.reporter.handle(&err, &context).await;
                        Vec::new()
                    }
                }
            })
            .buffer_unordered(self.settings.fanout_concurrency.max(1))
            .collect()
            .await;

        fetched.into_iter().flatten().collect()
    }

    /// One lookup per distinct `(asin, sku, marketplace)` among the items.
    async fn fetch_sales(
        &self,
        config: &ExtractionConfig,
        items: &[OrderItem],
        markets: &HashMap<&str, &str>,
    ) -> Vec<SalesMetric> {
        let products: BTreeSet<(&str, &str, &str)> = items
            .iter()
            .filter_map(|item| {
                let market = markets.get(item.order_id.as_str())?;
                Some((item.asin.as_str(), item.seller_sku.as_str(), *market))
            })
            .collect();

        let interval = SalesInterval { start: config.date_from(), end: config.date_to() };
        let api = &self.ports.api;
        let interval = &interval;
        let fetched: Vec<Vec<SalesMetric>> = stream::iter(products)
            .map(|(asin, sku, market)| async move {
                match api.get_sales_metrics(asin, sku, market, interval).await {
                    Ok(metrics) => metrics,
                    Err(err) => {
                        warn!(asin, sku, market, error = %err, "orchestrator.sales.failed");
                        let context =
                            ErrorContext::new(config.extract_type(), &err).with_market(market);
                        self.ports.reporter.handle(&err, &context).await;
                        Vec::new()
                    }
                }
            })
            .buffer_unordered(self.settings.fanout_concurrency.max(1))
            .collect()
            .await;

        fetched.into_iter().flatten().collect()
    }

    async fn record_success(&self, run_id: Uuid, config: &ExtractionConfig, count: usize) {
        if let Err(err) = self.ports.metrics.record_success(run_id, config, count).await {
            warn!(error = %err, "orchestrator.metrics.success_failed");
        }
    }

    async fn record_run_failure(
        &self,
        run_id: Uuid,
        config: &ExtractionConfig,
        err: &OrderFlowError,
    ) {
        if let Err(metrics_err) = self.ports.metrics.record_error(run_id, config, err).await {
            warn!(error = %metrics_err, "orchestrator.metrics.error_failed");
        }

        let mut context = ErrorContext::new(config.extract_type(), err);
        if let [market] = config.markets() {
            context = context.with_market(market);
        }
        self.ports.reporter.handle(err, &context).await;
    }
}

fn enter(phase: RunPhase) {
    Span::current().record("phase", phase.as_str());
    debug!(phase = %phase, "orchestrator.run.phase");
}
