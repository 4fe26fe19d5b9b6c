//! Failover orchestration state machine.
//!
//! One `execute()` call runs a full cycle:
//! - load the task state and skip if this node is already running
//! - write RUN
//! - replay the operations of a failed cycle, or discover addresses and
//!   routes concurrently
//! - apply both change sets concurrently once both discoveries finished
//! - write PASS, or FAIL with whatever operations were computed
//!
//! The RUN guard is a read-then-write against shared storage, not a lock.
//! Two nodes triggered within the same short window can both pass it.

use crate::addresses::{AddressReconciler, AddressSets};
use crate::declaration::Declaration;
use crate::provider::CloudProvider;
use crate::routes::RouteReconciler;
use crate::store::TaskStateStore;
use crate::topology::{self, DeviceTopology, TopologyReader};
use crate::types::{
    FailoverOperations, FailoverStatus, NO_ACTION_MESSAGE, Operation, ResetRequest,
    ResetResponse, STATE_FILE_NAME, STATE_FILE_RESET_MESSAGE, TaskState, TaskStatus,
    TrafficGroupName,
};
use common::{Error, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

/// Orchestrator tunables
#[derive(Debug, Clone)]
pub struct FailoverSettings {
    /// Storage key of the task state record
    pub state_key: String,

    /// Delay between re-reads while another node holds RUN
    pub run_wait_interval: Duration,

    /// Re-reads before taking over from another node's RUN
    pub run_wait_attempts: u32,
}

impl Default for FailoverSettings {
    fn default() -> Self {
        Self {
            state_key: STATE_FILE_NAME.to_string(),
            run_wait_interval: Duration::from_secs(2),
            run_wait_attempts: 5,
        }
    }
}

/// Values scoped to a single `execute()` call
struct ReconcileSession {
    topology: DeviceTopology,
    sets: AddressSets,
    /// Operations left by a failed cycle, replayed instead of discovered
    replay: FailoverOperations,
}

impl ReconcileSession {
    fn new(topology: DeviceTopology, prior: &TaskState) -> Self {
        let sets = AddressSets::compute(&topology);
        let replay = if prior.has_pending_operations() {
            prior.failover_operations.clone()
        } else {
            FailoverOperations::default()
        };
        Self {
            topology,
            sets,
            replay,
        }
    }

    fn hostname(&self) -> &str {
        &self.topology.hostname
    }
}

/// A failed cycle and the operations computed before it failed
struct ReconcileFailure {
    error: Error,
    operations: FailoverOperations,
}

/// Top-level failover state machine
pub struct FailoverOrchestrator {
    provider: Arc<dyn CloudProvider>,
    topology: Arc<dyn TopologyReader>,
    declaration: Option<Declaration>,
    store: TaskStateStore,
    addresses: AddressReconciler,
    routes: RouteReconciler,
    settings: FailoverSettings,
    initialized: OnceCell<()>,
}

impl FailoverOrchestrator {
    /// Create an orchestrator bound to one provider for its lifetime
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        topology: Arc<dyn TopologyReader>,
        declaration: Option<Declaration>,
        settings: FailoverSettings,
    ) -> Self {
        Self {
            store: TaskStateStore::with_key(provider.clone(), settings.state_key.clone()),
            addresses: AddressReconciler::new(provider.clone()),
            routes: RouteReconciler::new(provider.clone()),
            provider,
            topology,
            declaration,
            settings,
            initialized: OnceCell::new(),
        }
    }

    pub fn declaration(&self) -> Option<&Declaration> {
        self.declaration.as_ref()
    }

    /// Initialize the provider session once. Does nothing before a
    /// declaration exists.
    pub async fn init(&self) -> Result<()> {
        let Some(declaration) = self.declaration.as_ref() else {
            debug!("No declaration yet, skipping provider init");
            return Ok(());
        };
        self.initialized
            .get_or_try_init(|| async {
                self.provider.init(declaration).await.map_err(|e| match e {
                    Error::ProviderInit(_) => e,
                    other => Error::provider_init(other),
                })?;
                info!(environment = ?declaration.environment, "Cloud provider initialized");
                Ok::<(), Error>(())
            })
            .await?;
        Ok(())
    }

    /// Local hostname as reported by the device
    pub async fn local_hostname(&self) -> Result<String> {
        topology::local_hostname(self.topology.as_ref()).await
    }

    /// Run one reconciliation cycle and return the task state it wrote.
    ///
    /// Errors raised before the RUN write leave storage untouched; errors
    /// raised after it are recorded as FAIL and then returned.
    pub async fn execute(&self) -> Result<TaskState> {
        let declaration = self
            .declaration
            .as_ref()
            .ok_or_else(|| Error::config("Declaration not provided"))?;
        let environment = declaration.require_environment()?;
        info!(%environment, "Performing failover");

        let topology = DeviceTopology::read(self.topology.as_ref()).await?;
        let hostname = topology.hostname.clone();

        let prior = self.store.load().await?;
        let prior = self.wait_for_foreign_run(prior, &hostname).await?;
        if prior.is_running_on(&hostname) {
            info!(hostname = %hostname, "Failover already running on this instance");
            return Ok(prior);
        }

        self.init().await?;

        let session = ReconcileSession::new(topology, &prior);
        self.store.save(&TaskState::running(&hostname)).await?;

        let started = Instant::now();
        match self.reconcile(&session).await {
            Ok(()) => {
                let state = TaskState::passed(session.hostname());
                self.store.save(&state).await?;
                info!(
                    hostname = %hostname,
                    duration_ms = started.elapsed().as_millis(),
                    "Failover completed"
                );
                Ok(state)
            }
            Err(failure) => {
                error!(hostname = %hostname, error = %failure.error, "Failover failed");
                let state = TaskState::failed(
                    session.hostname(),
                    failure.error.to_string(),
                    failure.operations,
                );
                if let Err(e) = self.store.save(&state).await {
                    warn!(error = %e, "Failed to record failover failure");
                }
                Err(failure.error)
            }
        }
    }

    /// Re-read the state while another instance holds RUN. Stops early once
    /// `hostname` holds RUN itself; takes over once the attempts run out.
    async fn wait_for_foreign_run(
        &self,
        mut state: TaskState,
        hostname: &str,
    ) -> Result<TaskState> {
        let mut attempt = 0;
        while state.task_state == TaskStatus::Run
            && !state.is_running_on(hostname)
            && attempt < self.settings.run_wait_attempts
        {
            attempt += 1;
            debug!(
                instance = ?state.instance,
                attempt,
                "Another instance is running failover, waiting"
            );
            tokio::time::sleep(self.settings.run_wait_interval).await;
            state = self.store.load().await?;
        }

        if state.task_state == TaskStatus::Run && !state.is_running_on(hostname) {
            warn!(instance = ?state.instance, "Taking over failover from another instance");
        }
        Ok(state)
    }

    async fn reconcile(
        &self,
        session: &ReconcileSession,
    ) -> std::result::Result<(), ReconcileFailure> {
        if !session.replay.is_empty() {
            info!("Recovering from previous failover failure");
        }

        let (addresses, routes) = tokio::join!(
            self.address_operation(session),
            self.route_operation(session),
        );

        let mut operations = FailoverOperations::default();
        let mut first_error = None;
        match addresses {
            Ok(op) => operations.addresses = Some(op),
            Err(e) => first_error = Some(e),
        }
        match routes {
            Ok(op) => operations.routes = Some(op),
            Err(e) => match first_error {
                Some(_) => warn!(error = %e, "Route discovery failed"),
                None => first_error = Some(e),
            },
        }
        if let Some(error) = first_error {
            return Err(ReconcileFailure { error, operations });
        }

        let address_op = operations.addresses.clone().unwrap_or_default();
        let route_op = operations.routes.clone().unwrap_or_default();
        let (addresses, routes) = tokio::join!(
            self.addresses.apply(address_op),
            self.routes.apply(route_op),
        );

        match (addresses, routes) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(error), routes) => {
                if let Err(e) = routes {
                    warn!(error = %e, "Route update failed");
                }
                Err(ReconcileFailure { error, operations })
            }
            (Ok(()), Err(error)) => Err(ReconcileFailure { error, operations }),
        }
    }

    async fn address_operation(&self, session: &ReconcileSession) -> Result<Operation> {
        match &session.replay.addresses {
            Some(op) => Ok(op.clone()),
            None => self.addresses.discover(&session.sets).await,
        }
    }

    async fn route_operation(&self, session: &ReconcileSession) -> Result<Operation> {
        match &session.replay.routes {
            Some(op) => Ok(op.clone()),
            None => self.routes.discover(&session.sets.local).await,
        }
    }

    /// Force the stored state back to PASS with no pending operations
    pub async fn reset_failover_state(&self, request: ResetRequest) -> Result<ResetResponse> {
        if !request.reset_state_file {
            return Ok(ResetResponse {
                message: NO_ACTION_MESSAGE.to_string(),
            });
        }

        self.store.save(&TaskState::reset()).await?;
        info!("Failover state file reset");
        Ok(ResetResponse {
            message: STATE_FILE_RESET_MESSAGE.to_string(),
        })
    }

    /// Current task state, unchanged
    pub async fn get_task_state_file(&self) -> Result<TaskState> {
        self.store.load().await
    }

    /// Provider-side associations plus local traffic group ownership
    pub async fn get_failover_status_and_objects(&self) -> Result<FailoverStatus> {
        let reader = self.topology.as_ref();
        let (info, hostname, groups) = tokio::try_join!(
            self.provider.get_associated_address_and_route_info(),
            topology::local_hostname(reader),
            async {
                reader
                    .traffic_groups()
                    .await
                    .map_err(Error::device_query)
            },
        )?;

        let traffic_group: Vec<TrafficGroupName> =
            topology::owned_traffic_groups(&groups, &hostname)
                .into_iter()
                .map(|g| TrafficGroupName {
                    name: g.name.clone(),
                })
                .collect();
        let device_status = if traffic_group.is_empty() {
            "standby"
        } else {
            "active"
        };

        Ok(FailoverStatus {
            addresses: info.addresses,
            routes: info.routes,
            host_name: hostname,
            device_status: device_status.to_string(),
            traffic_group,
        })
    }
}
