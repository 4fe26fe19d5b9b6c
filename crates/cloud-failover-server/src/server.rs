//! Failover server assembly: agents, orchestrator state and the HTTP API.

use crate::agent::AgentClient;
use crate::http_server::ApiServer;
use crate::metrics::MetricsRegistry;
use crate::sidecar::{DeviceAgent, SidecarFactory};
use crate::state::{self, AppState};
use crate::types::ServerConfig;
use cloud_failover::FailoverSettings;
use common::logging::LogLevelHandle;
use std::sync::Arc;
use tracing::{info, warn};

/// Failover server
pub struct FailoverServer {
    config: ServerConfig,
    log_level: Option<LogLevelHandle>,
}

impl FailoverServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            log_level: None,
        }
    }

    /// Let accepted declarations change the log level
    pub fn with_log_level(mut self, handle: LogLevelHandle) -> Self {
        self.log_level = Some(handle);
        self
    }

    /// Build the shared state the API serves from
    pub async fn build_state(&self) -> Result<AppState, Box<dyn std::error::Error>> {
        let provider_client =
            AgentClient::new(&self.config.provider_socket, self.config.request_timeout);
        let device_client =
            AgentClient::new(&self.config.device_socket, self.config.request_timeout);

        let declaration = match &self.config.declaration_path {
            Some(path) => state::load_declaration(path).await.unwrap_or_else(|e| {
                warn!(error = %e, path = %path.display(), "Ignoring stored declaration");
                None
            }),
            None => None,
        };
        match declaration.as_ref().and_then(|d| d.environment) {
            Some(environment) => info!(%environment, "Loaded stored declaration"),
            None => info!("No declaration yet, waiting for one"),
        }
        if let (Some(handle), Some(level)) = (
            &self.log_level,
            declaration.as_ref().and_then(|d| d.log_level()),
        ) {
            handle.set_level(level)?;
        }

        let settings = FailoverSettings {
            state_key: self.config.state_key.clone(),
            run_wait_interval: self.config.run_wait_interval,
            run_wait_attempts: self.config.run_wait_attempts,
        };

        let mut app_state = AppState::new(
            Arc::new(SidecarFactory::new(provider_client)),
            Arc::new(DeviceAgent::new(device_client)),
            settings,
            declaration,
        );
        if let Some(path) = &self.config.declaration_path {
            app_state = app_state.with_declaration_path(path);
        }
        if self.config.metrics_enabled {
            app_state = app_state.with_metrics(Arc::new(MetricsRegistry::new()));
            info!("Metrics enabled");
        } else {
            info!("Metrics disabled");
        }
        if let Some(handle) = &self.log_level {
            app_state = app_state.with_log_level(handle.clone());
        }

        Ok(app_state)
    }

    /// Run the server until the API stops or a shutdown signal arrives
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Starting failover server");

        let state = Arc::new(self.build_state().await?);
        let api = ApiServer::new(
            state,
            self.config.listen_addr.clone(),
            self.config.base_path.clone(),
        );

        tokio::select! {
            result = api.run() => {
                if let Err(e) = &result {
                    warn!(error = %e, "API server error");
                }
                result?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
            }
        }

        info!("Failover server stopped");
        Ok(())
    }
}
