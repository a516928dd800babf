//! Marketplace API adapter

pub mod client;
pub mod payload;

pub use client::MarketplaceClient;
