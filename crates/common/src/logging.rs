//! Logging utilities for the cloud failover components.

use crate::error::{Error, Result};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

/// Initialize tracing with a filter that can be swapped at runtime.
///
/// RUST_LOG wins over `level` when set, both here and for every later
/// [`LogLevelHandle::set_level`].
pub fn init_reloadable(level: &str, json: bool) -> LogLevelHandle {
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_override = from_env.is_some();
    let filter = from_env
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .init();

    LogLevelHandle {
        handle,
        env_override,
    }
}

/// Handle for changing the active log level after initialization.
#[derive(Clone)]
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    env_override: bool,
}

impl LogLevelHandle {
    /// Apply a declaration log level (`silly`, `verbose`, `debug`, `info`,
    /// `warning`, `error`) or any tracing directive.
    pub fn set_level(&self, level: &str) -> Result<()> {
        let directive = map_log_level(level);
        if self.env_override {
            tracing::info!(level = directive, "RUST_LOG is set, keeping its filter");
            return Ok(());
        }
        let filter = EnvFilter::try_new(directive)
            .map_err(|e| Error::config(format!("invalid log level '{}': {}", level, e)))?;
        self.handle
            .reload(filter)
            .map_err(|e| Error::config(format!("failed to apply log level: {}", e)))?;
        tracing::info!(level = directive, "Log level updated");
        Ok(())
    }
}

/// Translate declaration log levels into tracing filter directives.
pub fn map_log_level(level: &str) -> &str {
    match level {
        "silly" | "verbose" => "trace",
        "warning" => "warn",
        other => other,
    }
}
