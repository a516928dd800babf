//! Configuration loader
//!
//! Loads [`AppConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If a required variable is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! Required:
//! - `ORDERFLOW_DB_PATH`: Database file path
//! - `ORDERFLOW_API_BASE_URL`: Marketplace API base URL
//! - `ORDERFLOW_MARKETS`: Comma-separated marketplace ids
//!
//! Optional (defaults apply when unset):
//! - `ORDERFLOW_DB_POOL_SIZE`: Connection pool size
//! - `ORDERFLOW_API_ACCESS_TOKEN`: Access token sent with every request
//! - `ORDERFLOW_API_TIMEOUT_SECS`: HTTP request timeout
//! - `ORDERFLOW_BATCH_SIZE`: Orders persisted per batch
//! - `ORDERFLOW_STALE_AFTER_DAYS`: Age at which the weekly run reconciles an
//!   order
//! - `ORDERFLOW_RETRY_COOLDOWN_SECS`: Pause before the single run retry
//! - `ORDERFLOW_RETRY_MAX_ATTEMPTS`: Attempts per API call
//! - `ORDERFLOW_LOCK_FILE`: Single-instance lock file
//! - `ORDERFLOW_METRICS_PATH`: JSON-lines metrics file
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./orderflow.toml` or `./orderflow.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names one directory up
//! 4. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use orderflow_domain::constants::{
    DEFAULT_DB_POOL_SIZE, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_METRICS_PATH, DEFAULT_RETRY_ATTEMPTS,
};
use orderflow_domain::{
    ApiConfig, AppConfig, DatabaseConfig, ExtractionSettings, MetricsConfig, OrderFlowError,
    RateLimitSettings, Result, RetrySettings,
};

const CONFIG_FILE_NAMES: &[&str] =
    &["orderflow.toml", "orderflow.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `OrderFlowError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<AppConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("config.loaded_from_env");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "config.env_incomplete_trying_file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `OrderFlowError::Config` if required variables are missing or
/// any variable has an invalid value.
pub fn load_from_env() -> Result<AppConfig> {
    let db_path = env_var("ORDERFLOW_DB_PATH")?;
    let base_url = env_var("ORDERFLOW_API_BASE_URL")?;
    let markets = parse_markets(&env_var("ORDERFLOW_MARKETS")?);

    let mut extraction = ExtractionSettings::new(markets);
    extraction.batch_size = env_parse("ORDERFLOW_BATCH_SIZE", extraction.batch_size)?;
    extraction.stale_after_days =
        env_parse("ORDERFLOW_STALE_AFTER_DAYS", extraction.stale_after_days)?;
    extraction.retry_cooldown_secs =
        env_parse("ORDERFLOW_RETRY_COOLDOWN_SECS", extraction.retry_cooldown_secs)?;
    if let Some(lock_file) = env_opt("ORDERFLOW_LOCK_FILE") {
        extraction.lock_file = lock_file;
    }

    let retry = RetrySettings {
        max_attempts: env_parse("ORDERFLOW_RETRY_MAX_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS)?,
        ..RetrySettings::default()
    };
    let metrics = MetricsConfig {
        path: env_opt("ORDERFLOW_METRICS_PATH").unwrap_or_else(|| DEFAULT_METRICS_PATH.into()),
    };

    let config = AppConfig {
        database: DatabaseConfig {
            path: db_path,
            pool_size: env_parse("ORDERFLOW_DB_POOL_SIZE", DEFAULT_DB_POOL_SIZE)?,
        },
        api: ApiConfig {
            base_url,
            access_token: env_opt("ORDERFLOW_API_ACCESS_TOKEN"),
            timeout_secs: env_parse("ORDERFLOW_API_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
        },
        extraction,
        rate_limits: RateLimitSettings::default(),
        retry,
        metrics,
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. The format is chosen
/// by file extension.
///
/// # Errors
/// Returns `OrderFlowError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or validation fails
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(OrderFlowError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            OrderFlowError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "config.loading_file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| OrderFlowError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content, detecting the format by
/// extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| OrderFlowError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| OrderFlowError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(OrderFlowError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// Returns the first file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn parse_markets(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|m| !m.is_empty()).map(String::from).collect()
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        OrderFlowError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Optional, non-empty environment variable
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an optional environment variable, falling back to `default`
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| OrderFlowError::Config(format!("Invalid value for {key}: {e}"))),
        None => Ok(default),
    }
}
