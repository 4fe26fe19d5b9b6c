//! Route reconciliation. Routes are resolved by next hop, so only the local
//! addresses are handed to the provider.

use crate::provider::{CloudProvider, RouteUpdate};
use crate::types::Operation;
use common::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Drives route discover/apply calls against the provider
pub struct RouteReconciler {
    provider: Arc<dyn CloudProvider>,
}

impl RouteReconciler {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self { provider }
    }

    pub async fn discover(&self, local_addresses: &[String]) -> Result<Operation> {
        debug!(local = ?local_addresses, "Discovering route operations");
        self.provider
            .update_routes(RouteUpdate::discover(local_addresses.to_vec()))
            .await
    }

    pub async fn apply(&self, operation: Operation) -> Result<()> {
        self.provider
            .update_routes(RouteUpdate::apply(operation))
            .await?;
        info!("Route operations applied");
        Ok(())
    }
}
