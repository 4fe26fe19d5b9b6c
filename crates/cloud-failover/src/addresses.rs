//! Address reconciliation: which addresses follow this node, and the
//! discover/apply calls that move them.

use crate::provider::{AddressUpdate, CloudProvider};
use crate::topology::DeviceTopology;
use crate::types::{AddressObject, Operation};
use common::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Local and failover address sets for one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSets {
    /// Addresses bound to this node's interfaces
    pub local: Vec<String>,
    /// Addresses that must point at this node
    pub failover: Vec<String>,
}

impl AddressSets {
    /// Compute the sets from a topology snapshot.
    ///
    /// Output is deduplicated and ordered by first appearance (self IPs, then
    /// virtual, SNAT translation and NAT translation addresses), so the same
    /// snapshot always yields the same sets.
    pub fn compute(topology: &DeviceTopology) -> Self {
        let owned: HashSet<&str> = topology
            .owned_traffic_groups()
            .into_iter()
            .map(|g| g.name.as_str())
            .collect();

        let local = unique_addresses(
            topology
                .self_addresses
                .iter()
                .filter(|a| a.is_local_only() || owned.contains(a.traffic_group.as_str())),
        );

        // Partition is deliberately ignored: tenant partitions fail over too.
        let failover = unique_addresses(
            topology
                .virtual_addresses
                .iter()
                .chain(&topology.snat_translation_addresses)
                .chain(&topology.nat_addresses)
                .filter(|a| owned.contains(a.traffic_group.as_str())),
        );

        Self { local, failover }
    }
}

fn unique_addresses<'a>(addresses: impl Iterator<Item = &'a AddressObject>) -> Vec<String> {
    let mut seen = HashSet::new();
    addresses
        .map(AddressObject::bare_address)
        .filter(|a| seen.insert(*a))
        .map(str::to_string)
        .collect()
}

/// Drives address discover/apply calls against the provider
pub struct AddressReconciler {
    provider: Arc<dyn CloudProvider>,
}

impl AddressReconciler {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self { provider }
    }

    /// Compute the change set without applying it
    pub async fn discover(&self, sets: &AddressSets) -> Result<Operation> {
        debug!(
            local = ?sets.local,
            failover = ?sets.failover,
            "Discovering address operations"
        );
        self.provider
            .update_addresses(AddressUpdate::discover(
                sets.local.clone(),
                sets.failover.clone(),
            ))
            .await
    }

    /// Apply a change set returned by [`discover`](Self::discover) or
    /// replayed from a failed cycle
    pub async fn apply(&self, operation: Operation) -> Result<()> {
        self.provider
            .update_addresses(AddressUpdate::apply(operation))
            .await?;
        info!("Address operations applied");
        Ok(())
    }
}
