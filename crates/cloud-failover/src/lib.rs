//! Automated failover reconciliation for clustered appliances in public clouds.
//!
//! When a traffic group moves to this node, the cloud still points its
//! addresses and routes at the previous owner. This crate computes which
//! addresses and routes must follow and drives a cloud provider to move them,
//! recording progress in a task state record shared by all nodes.
//!
//! # Components
//!
//! - [`topology`]: read-only view of the local device
//! - [`addresses`] and [`routes`]: discover/apply change sets
//! - [`store`]: the shared task state record
//! - [`orchestrator`]: the RUN/PASS/FAIL state machine tying them together
//!
//! Cloud specifics stay behind [`CloudProvider`]; the device behind
//! [`TopologyReader`].
//!
//! # Example
//!
//! ```no_run
//! use cloud_failover::{
//!     CloudProvider, Declaration, FailoverOrchestrator, FailoverSettings, TopologyReader,
//! };
//! use cloud_failover::declaration::CloudEnvironment;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     provider: Arc<dyn CloudProvider>,
//! #     device: Arc<dyn TopologyReader>,
//! # ) -> common::Result<()> {
//! let orchestrator = FailoverOrchestrator::new(
//!     provider,
//!     device,
//!     Some(Declaration::new(CloudEnvironment::Aws)),
//!     FailoverSettings::default(),
//! );
//!
//! let state = orchestrator.execute().await?;
//! println!("{}: {}", state.task_state, state.message);
//! # Ok(())
//! # }
//! ```

pub mod addresses;
pub mod declaration;
pub mod orchestrator;
pub mod provider;
pub mod routes;
pub mod store;
pub mod topology;
pub mod types;

pub use addresses::{AddressReconciler, AddressSets};
pub use declaration::{CloudEnvironment, Declaration};
pub use orchestrator::{FailoverOrchestrator, FailoverSettings};
pub use provider::{AddressUpdate, CloudProvider, RouteUpdate};
pub use routes::RouteReconciler;
pub use store::TaskStateStore;
pub use topology::{DeviceTopology, TopologyReader};
pub use types::{
    AddressObject, AssociatedInfo, FailoverOperations, FailoverStatus, GlobalSettings,
    Operation, ResetRequest, ResetResponse, TaskState, TaskStatus, TrafficGroupStatus,
};
