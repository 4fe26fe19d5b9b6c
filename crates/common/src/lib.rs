//! Common utilities and types shared across the cloud failover crates.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
