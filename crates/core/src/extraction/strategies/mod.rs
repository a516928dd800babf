//! Extraction strategies, one per run mode
//!
//! Dispatch is a closed enum. [`StrategyTable`] builds every variant once so
//! a missing dependency is reported before any run starts.

mod daily_full;
mod incremental;
mod status_update;
mod weekly_catch_up;

use std::sync::Arc;

use chrono::Duration;
use orderflow_domain::constants::DEFAULT_STALE_AFTER_DAYS;
use orderflow_domain::{ExtractType, ExtractionConfig, ExtractionSettings, OrderRecord, Result};

pub use daily_full::DailyFullExtraction;
pub use incremental::IncrementalExtraction;
pub use status_update::StatusUpdateExtraction;
pub use weekly_catch_up::{CatchUpPlan, WeeklyCatchUpExtraction};

use super::ports::{MarketplaceApi, OrderStore};

/// Tunables shared by the strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategySettings {
    /// Longest window an incremental run looks back over
    pub incremental_lookback: Duration,
    /// Age after which a pending order is reconciled weekly
    pub stale_after: Duration,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            incremental_lookback: ExtractType::Incremental.default_window(),
            stale_after: Duration::days(DEFAULT_STALE_AFTER_DAYS),
        }
    }
}

impl From<&ExtractionSettings> for StrategySettings {
    fn from(settings: &ExtractionSettings) -> Self {
        Self { stale_after: Duration::days(settings.stale_after_days), ..Self::default() }
    }
}

#[derive(Clone)]
pub enum ExtractionStrategy {
    DailyFull(DailyFullExtraction),
    Incremental(IncrementalExtraction),
    StatusUpdate(StatusUpdateExtraction),
    WeeklyCatchUp(WeeklyCatchUpExtraction),
}

impl ExtractionStrategy {
    pub const fn extract_type(&self) -> ExtractType {
        match self {
            Self::DailyFull(_) => ExtractType::DailyFull,
            Self::Incremental(_) => ExtractType::Incremental,
            Self::StatusUpdate(_) => ExtractType::StatusUpdate,
            Self::WeeklyCatchUp(_) => ExtractType::WeeklyCatchUp,
        }
    }

    /// Orders to persist for this run. Each `order_id` appears at most once.
    pub async fn extract(&self, config: &ExtractionConfig) -> Result<Vec<OrderRecord>> {
        match self {
            Self::DailyFull(strategy) => strategy.extract(config).await,
            Self::Incremental(strategy) => strategy.extract(config).await,
            Self::StatusUpdate(strategy) => strategy.extract(config).await,
            Self::WeeklyCatchUp(strategy) => strategy.extract(config).await,
        }
    }
}

/// Static `ExtractType -> ExtractionStrategy` lookup
#[derive(Clone)]
pub struct StrategyTable {
    daily_full: ExtractionStrategy,
    incremental: ExtractionStrategy,
    status_update: ExtractionStrategy,
    weekly_catch_up: ExtractionStrategy,
}

impl StrategyTable {
    /// Fails with `OrderFlowError::Config` when `store` is `None`, since two
    /// of the four strategies read local state.
    pub fn new(
        api: Arc<dyn MarketplaceApi>,
        store: Option<Arc<dyn OrderStore>>,
        settings: StrategySettings,
    ) -> Result<Self> {
        Ok(Self {
            daily_full: ExtractionStrategy::DailyFull(DailyFullExtraction::new(api.clone())),
            incremental: ExtractionStrategy::Incremental(IncrementalExtraction::new(
                api.clone(),
                settings.incremental_lookback,
            )),
            status_update: ExtractionStrategy::StatusUpdate(StatusUpdateExtraction::new(
                api.clone(),
                store.clone(),
            )?),
            weekly_catch_up: ExtractionStrategy::WeeklyCatchUp(WeeklyCatchUpExtraction::new(
                api,
                store,
                settings.stale_after,
            )?),
        })
    }

    pub const fn get(&self, extract_type: ExtractType) -> &ExtractionStrategy {
        match extract_type {
            ExtractType::DailyFull => &self.daily_full,
            ExtractType::Incremental => &self.incremental,
            ExtractType::StatusUpdate => &self.status_update,
            ExtractType::WeeklyCatchUp => &self.weekly_catch_up,
        }
    }
}
