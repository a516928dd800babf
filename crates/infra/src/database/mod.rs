//! Database implementations

pub mod manager;
pub mod order_repository;

pub use manager::*;
pub use order_repository::*;
