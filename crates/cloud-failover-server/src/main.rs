//! Cloud failover server binary

use cloud_failover_server::{Config, FailoverServer, ServerConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first (needed for logging settings)
    let yaml_config = match Config::load() {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("Using default configuration");
            None
        }
    };

    let (level, json) = yaml_config
        .as_ref()
        .map(|cfg| {
            (
                cfg.logging.level.clone().unwrap_or_else(|| "info".into()),
                cfg.logging.format.as_deref() == Some("json"),
            )
        })
        .unwrap_or_else(|| ("info".into(), false));
    let log_level = common::logging::init_reloadable(&level, json);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Cloud failover server starting");

    let server_config = yaml_config
        .map(|cfg| cfg.to_server_config())
        .unwrap_or_else(|| {
            tracing::warn!("Using default configuration");
            ServerConfig::default()
        });

    FailoverServer::new(server_config)
        .with_log_level(log_level)
        .run()
        .await
}
