//! Device topology boundary.
//!
//! The device itself is queried by an external collaborator; the core only
//! consumes its answers through [`TopologyReader`].

use crate::types::{AddressObject, GlobalSettings, TrafficGroupStatus};
use async_trait::async_trait;
use common::{Error, Result};
use tracing::debug;

/// Read-only view of the local device
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TopologyReader: Send + Sync {
    /// Device global settings; `None` when the device returned nothing
    async fn global_settings(&self) -> Result<Option<GlobalSettings>>;

    async fn traffic_groups(&self) -> Result<Vec<TrafficGroupStatus>>;

    async fn self_addresses(&self) -> Result<Vec<AddressObject>>;

    async fn virtual_addresses(&self) -> Result<Vec<AddressObject>>;

    async fn snat_translation_addresses(&self) -> Result<Vec<AddressObject>>;

    async fn nat_addresses(&self) -> Result<Vec<AddressObject>>;
}

/// Snapshot of everything one reconciliation cycle reads from the device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceTopology {
    pub hostname: String,
    pub traffic_groups: Vec<TrafficGroupStatus>,
    pub self_addresses: Vec<AddressObject>,
    pub virtual_addresses: Vec<AddressObject>,
    pub snat_translation_addresses: Vec<AddressObject>,
    pub nat_addresses: Vec<AddressObject>,
}

impl DeviceTopology {
    /// Query all topology sources concurrently
    pub async fn read(reader: &dyn TopologyReader) -> Result<Self> {
        let (hostname, traffic_groups, self_addresses, virtual_addresses, snat, nat) =
            tokio::try_join!(
                local_hostname(reader),
                reader.traffic_groups(),
                reader.self_addresses(),
                reader.virtual_addresses(),
                reader.snat_translation_addresses(),
                reader.nat_addresses(),
            )
            .map_err(into_device_error)?;

        debug!(
            hostname = %hostname,
            traffic_groups = traffic_groups.len(),
            self_addresses = self_addresses.len(),
            virtual_addresses = virtual_addresses.len(),
            snat_addresses = snat.len(),
            nat_addresses = nat.len(),
            "Read device topology"
        );

        Ok(Self {
            hostname,
            traffic_groups,
            self_addresses,
            virtual_addresses,
            snat_translation_addresses: snat,
            nat_addresses: nat,
        })
    }

    /// Traffic groups the local node is the active owner of
    pub fn owned_traffic_groups(&self) -> Vec<&TrafficGroupStatus> {
        owned_traffic_groups(&self.traffic_groups, &self.hostname)
    }
}

/// Local hostname from the device global settings
pub async fn local_hostname(reader: &dyn TopologyReader) -> Result<String> {
    match reader.global_settings().await.map_err(into_device_error)? {
        Some(settings) if !settings.hostname.is_empty() => Ok(settings.hostname),
        _ => Err(Error::device_query(
            "device global settings did not include a hostname",
        )),
    }
}

/// Traffic groups in `groups` whose active owner is `hostname`
pub fn owned_traffic_groups<'a>(
    groups: &'a [TrafficGroupStatus],
    hostname: &str,
) -> Vec<&'a TrafficGroupStatus> {
    groups.iter().filter(|g| g.is_active_on(hostname)).collect()
}

fn into_device_error(err: Error) -> Error {
    match err {
        Error::DeviceQuery(_) => err,
        other => Error::device_query(other),
    }
}
