//! Configuration loading and validation for the failover server

use crate::types::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub agent: AgentSettings,

    #[serde(default)]
    pub failover: FailoverSection,

    #[serde(default)]
    pub metrics: MetricsSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.server.validate()?;
        self.agent.validate()?;
        self.failover.validate()?;
        Ok(())
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerSettings {
    #[validate(length(min = 1))]
    pub listen_addr: String,

    #[validate(custom = "validate_base_path")]
    pub base_path: String,
}

/// Cloud/device agent connection settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AgentSettings {
    #[validate(length(min = 1), custom = "validate_socket_path")]
    pub provider_socket: String,

    #[validate(length(min = 1), custom = "validate_socket_path")]
    pub device_socket: String,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_request_timeout")]
    pub request_timeout: Duration,
}

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FailoverSection {
    #[validate(length(min = 1))]
    pub state_key: String,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_run_wait_interval")]
    pub run_wait_interval: Duration,

    #[validate(range(max = 100))]
    pub run_wait_attempts: u32,

    /// Where the last accepted declaration is kept across restarts
    pub declaration_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8100".to_string(),
            base_path: "/mgmt/shared/cloud-failover".to_string(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            provider_socket: "/var/run/cloud-failover/provider.sock".to_string(),
            device_socket: "/var/run/cloud-failover/device.sock".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl Default for FailoverSection {
    fn default() -> Self {
        Self {
            state_key: cloud_failover::types::STATE_FILE_NAME.to_string(),
            run_wait_interval: Duration::from_secs(2),
            run_wait_attempts: 5,
            declaration_path: Some(PathBuf::from(
                "/var/lib/cloud-failover/declaration.json",
            )),
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// Custom validators

fn validate_socket_path(path: &str) -> Result<(), ValidationError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("socket_path_empty"));
    }

    // Must be absolute path or relative (starting with ./)
    if !trimmed.starts_with('/') && !trimmed.starts_with("./") {
        return Err(ValidationError::new("socket_path_invalid_format"));
    }

    Ok(())
}

fn validate_base_path(path: &str) -> Result<(), ValidationError> {
    if !path.starts_with('/') || path.len() < 2 || path.ends_with('/') {
        return Err(ValidationError::new("base_path_invalid_format"));
    }
    Ok(())
}

fn validate_request_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let millis = timeout.as_millis();
    if millis < 100 || millis > 600_000 {
        return Err(ValidationError::new("request_timeout_out_of_range"));
    }
    Ok(())
}

fn validate_run_wait_interval(interval: &Duration) -> Result<(), ValidationError> {
    let millis = interval.as_millis();
    if millis < 10 || millis > 60_000 {
        return Err(ValidationError::new("run_wait_interval_out_of_range"));
    }
    Ok(())
}

// Configuration loading implementation

impl Config {
    /// Load configuration from default search paths
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/cloud-failover/server.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./cloud-failover.yaml"));

        paths.into_iter().find(|p| p.is_file())
    }

    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/cloud-failover/server.yaml"))
    }

    /// Flatten into the runtime settings the server is built from
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.server.listen_addr.clone(),
            base_path: self.server.base_path.clone(),
            provider_socket: PathBuf::from(&self.agent.provider_socket),
            device_socket: PathBuf::from(&self.agent.device_socket),
            request_timeout: self.agent.request_timeout,
            state_key: self.failover.state_key.clone(),
            run_wait_interval: self.failover.run_wait_interval,
            run_wait_attempts: self.failover.run_wait_attempts,
            declaration_path: self.failover.declaration_path.clone(),
            metrics_enabled: self.metrics.enabled,
        }
    }
}
