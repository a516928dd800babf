//! # OrderFlow Infrastructure
//!
//! Infrastructure implementations of the core extraction ports.
//!
//! This crate contains:
//! - SQLite order store behind an r2d2 pool
//! - HTTP marketplace client (reqwest)
//! - Metrics, error reporting and notification sinks
//! - Configuration loading and the single-instance lock
//!
//! ## Architecture
//! - Implements traits defined in `orderflow-core`
//! - Depends on `orderflow-domain` and `orderflow-core`
//! - Contains all "impure" code (I/O, network, filesystem)

pub mod config;
pub mod database;
pub mod errors;
pub mod instance_lock;
pub mod marketplace;
pub mod observability;

// Re-export commonly used items
pub use database::{DbManager, SqliteOrderStore};
pub use errors::InfraError;
pub use instance_lock::InstanceLock;
pub use marketplace::MarketplaceClient;
pub use observability::{
    init_tracing, JsonlMetricsSink, LogFormat, LogNotifier, TracingErrorReporter,
};
