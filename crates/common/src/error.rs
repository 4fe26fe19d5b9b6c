//! Common error types for the cloud failover components.

use std::fmt;

/// A specialized Result type for failover operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for failover operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid environment/declaration. Raised before any task
    /// state is written.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Device query error: {0}")]
    DeviceQuery(String),

    #[error("Provider init error: {0}")]
    ProviderInit(String),

    #[error("Provider address error: {0}")]
    ProviderAddress(String),

    #[error("Provider route error: {0}")]
    ProviderRoute(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new device query error.
    pub fn device_query(msg: impl fmt::Display) -> Self {
        Error::DeviceQuery(msg.to_string())
    }

    /// Create a new provider init error.
    pub fn provider_init(msg: impl fmt::Display) -> Self {
        Error::ProviderInit(msg.to_string())
    }

    /// Create a new provider address error.
    pub fn provider_address(msg: impl fmt::Display) -> Self {
        Error::ProviderAddress(msg.to_string())
    }

    /// Create a new provider route error.
    pub fn provider_route(msg: impl fmt::Display) -> Self {
        Error::ProviderRoute(msg.to_string())
    }

    /// Create a new storage error.
    pub fn storage(msg: impl fmt::Display) -> Self {
        Error::Storage(msg.to_string())
    }

    /// Create a new validation error.
    pub fn validation(msg: impl fmt::Display) -> Self {
        Error::Validation(msg.to_string())
    }

    /// Whether the error was raised before any state mutation could happen.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
