//! Shared server state: the active declaration and the orchestrator built
//! from it.

use crate::metrics::MetricsRegistry;
use cloud_failover::{
    CloudEnvironment, CloudProvider, Declaration, FailoverOrchestrator, FailoverSettings,
    TopologyReader,
};
use common::logging::LogLevelHandle;
use common::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Selects the provider variant for an environment
pub trait ProviderFactory: Send + Sync {
    fn provider(&self, environment: Option<CloudEnvironment>) -> Arc<dyn CloudProvider>;
}

pub struct AppState {
    factory: Arc<dyn ProviderFactory>,
    topology: Arc<dyn TopologyReader>,
    settings: FailoverSettings,
    declaration_path: Option<PathBuf>,
    orchestrator: RwLock<Arc<FailoverOrchestrator>>,
    pub metrics: Option<Arc<MetricsRegistry>>,
    log_level: Option<LogLevelHandle>,
}

impl AppState {
    pub fn new(
        factory: Arc<dyn ProviderFactory>,
        topology: Arc<dyn TopologyReader>,
        settings: FailoverSettings,
        declaration: Option<Declaration>,
    ) -> Self {
        let orchestrator = build(factory.as_ref(), &topology, &settings, declaration);
        Self {
            factory,
            topology,
            settings,
            declaration_path: None,
            orchestrator: RwLock::new(Arc::new(orchestrator)),
            metrics: None,
            log_level: None,
        }
    }

    pub fn with_declaration_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.declaration_path = Some(path.into());
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_log_level(mut self, handle: LogLevelHandle) -> Self {
        self.log_level = Some(handle);
        self
    }

    /// Orchestrator for the active declaration
    pub async fn orchestrator(&self) -> Arc<FailoverOrchestrator> {
        self.orchestrator.read().await.clone()
    }

    pub async fn declaration(&self) -> Option<Declaration> {
        self.orchestrator.read().await.declaration().cloned()
    }

    /// Make `declaration` active: initialize a provider session for it,
    /// then persist it and swap the orchestrator. A failed init leaves both
    /// the active and the persisted declaration untouched.
    pub async fn install(&self, declaration: Declaration) -> Result<()> {
        let orchestrator = Arc::new(build(
            self.factory.as_ref(),
            &self.topology,
            &self.settings,
            Some(declaration.clone()),
        ));
        orchestrator.init().await?;

        if let Some(path) = &self.declaration_path {
            persist(path, &declaration).await?;
        }

        if let (Some(handle), Some(level)) = (&self.log_level, declaration.log_level()) {
            if let Err(e) = handle.set_level(level) {
                warn!(error = %e, "Failed to apply declaration log level");
            }
        }

        *self.orchestrator.write().await = orchestrator;
        info!("Declaration installed");
        Ok(())
    }
}

fn build(
    factory: &dyn ProviderFactory,
    topology: &Arc<dyn TopologyReader>,
    settings: &FailoverSettings,
    declaration: Option<Declaration>,
) -> FailoverOrchestrator {
    let environment = declaration.as_ref().and_then(|d| d.environment);
    FailoverOrchestrator::new(
        factory.provider(environment),
        topology.clone(),
        declaration,
        settings.clone(),
    )
}

async fn persist(path: &Path, declaration: &Declaration) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(declaration)?;
    tokio::fs::write(path, body).await?;
    Ok(())
}

/// Read a previously persisted declaration; a missing file is not an error
pub async fn load_declaration(path: &Path) -> Result<Option<Declaration>> {
    match tokio::fs::read(path).await {
        Ok(body) => {
            let value = serde_json::from_slice(&body)?;
            Declaration::from_json(value).map(Some)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Io(e)),
    }
}
