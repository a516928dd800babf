//! Infrastructure error mapping

mod conversions;

pub use conversions::{to_domain, InfraError};
