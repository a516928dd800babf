//! # OrderFlow Domain
//!
//! Business domain types and models for OrderFlow.
//!
//! This crate contains:
//! - Order, order item and sales metric records
//! - Extraction run configuration (`ExtractType`, `ExtractionConfig`)
//! - Domain error types and Result definitions
//! - Application configuration structures
//!
//! ## Architecture
//! - No dependencies on other OrderFlow crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
