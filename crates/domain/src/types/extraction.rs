//! Extraction run configuration

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DAILY_FULL_WINDOW_HOURS, INCREMENTAL_WINDOW_HOURS, STATUS_UPDATE_WINDOW_HOURS,
    WEEKLY_CATCH_UP_WINDOW_DAYS,
};
use crate::errors::{OrderFlowError, Result};

/// Which extraction strategy a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractType {
    DailyFull,
    Incremental,
    StatusUpdate,
    #[serde(rename = "weekly_catchup", alias = "weekly_catch_up")]
    WeeklyCatchUp,
}

impl ExtractType {
    pub const ALL: [Self; 4] =
        [Self::DailyFull, Self::Incremental, Self::StatusUpdate, Self::WeeklyCatchUp];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DailyFull => "daily_full",
            Self::Incremental => "incremental",
            Self::StatusUpdate => "status_update",
            Self::WeeklyCatchUp => "weekly_catchup",
        }
    }

    /// Length of the date window a scheduled run of this type covers.
    pub fn default_window(self) -> Duration {
        match self {
            Self::DailyFull => Duration::hours(DAILY_FULL_WINDOW_HOURS),
            Self::Incremental => Duration::hours(INCREMENTAL_WINDOW_HOURS),
            Self::StatusUpdate => Duration::hours(STATUS_UPDATE_WINDOW_HOURS),
            Self::WeeklyCatchUp => Duration::days(WEEKLY_CATCH_UP_WINDOW_DAYS),
        }
    }

    /// Whether persisted orders also get their items and sales fetched.
    pub const fn cascades_details(self) -> bool {
        !matches!(self, Self::StatusUpdate)
    }
}

impl fmt::Display for ExtractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractType {
    type Err = OrderFlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily_full" => Ok(Self::DailyFull),
            "incremental" => Ok(Self::Incremental),
            "status_update" => Ok(Self::StatusUpdate),
            "weekly_catchup" | "weekly_catch_up" => Ok(Self::WeeklyCatchUp),
            other => Err(OrderFlowError::InvalidInput(format!(
                "unknown extraction mode '{other}' (expected daily_full, incremental, \
                 status_update or weekly_catchup)"
            ))),
        }
    }
}

/// Validated parameters for one extraction run
///
/// Fields are private so the invariants (`date_from < date_to`, at least one
/// market, positive batch size) hold for every instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionConfig {
    extract_type: ExtractType,
    date_from: DateTime<Utc>,
    date_to: DateTime<Utc>,
    markets: Vec<String>,
    batch_size: usize,
}

impl ExtractionConfig {
    pub fn new(
        extract_type: ExtractType,
        date_from: DateTime<Utc>,
        date_to: DateTime<Utc>,
        markets: impl IntoIterator<Item = impl Into<String>>,
        batch_size: usize,
    ) -> Result<Self> {
        if date_from >= date_to {
            return Err(OrderFlowError::InvalidInput(format!(
                "date_from ({date_from}) must be before date_to ({date_to})"
            )));
        }
        if batch_size == 0 {
            return Err(OrderFlowError::InvalidInput("batch_size must be positive".into()));
        }

        let mut unique: Vec<String> = Vec::new();
        for market in markets {
            let market = market.into();
            let market = market.trim();
            if !market.is_empty() && !unique.iter().any(|m| m == market) {
                unique.push(market.to_string());
            }
        }
        if unique.is_empty() {
            return Err(OrderFlowError::InvalidInput("at least one market is required".into()));
        }

        Ok(Self { extract_type, date_from, date_to, markets: unique, batch_size })
    }

    /// Config for a scheduled run ending at `now`, using the mode's default
    /// window length.
    pub fn for_mode(
        extract_type: ExtractType,
        now: DateTime<Utc>,
        markets: impl IntoIterator<Item = impl Into<String>>,
        batch_size: usize,
    ) -> Result<Self> {
        Self::new(extract_type, now - extract_type.default_window(), now, markets, batch_size)
    }

    pub const fn extract_type(&self) -> ExtractType {
        self.extract_type
    }

    pub const fn date_from(&self) -> DateTime<Utc> {
        self.date_from
    }

    pub const fn date_to(&self) -> DateTime<Utc> {
        self.date_to
    }

    pub fn markets(&self) -> &[String] {
        &self.markets
    }

    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }
}
