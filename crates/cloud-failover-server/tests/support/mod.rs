//! In-memory provider and device used by the API tests

#![allow(dead_code)]

use async_trait::async_trait;
use cloud_failover::{
    AddressObject, AddressUpdate, AssociatedInfo, CloudEnvironment, CloudProvider, Declaration,
    GlobalSettings, Operation, RouteUpdate, TaskState, TopologyReader, TrafficGroupStatus,
};
use cloud_failover_server::ProviderFactory;
use common::{Error, Result};
use std::sync::{Arc, Mutex};

pub const HOSTNAME: &str = "bigip1";

/// Task state record shared by every provider a factory builds
pub type Storage = Arc<Mutex<Option<TaskState>>>;

#[derive(Default)]
pub struct MemoryFactory {
    pub storage: Storage,
    pub environments: Arc<Mutex<Vec<Option<CloudEnvironment>>>>,
    pub inits: Arc<Mutex<usize>>,
    /// Providers reject `init`
    pub reject_init: bool,
}

impl MemoryFactory {
    pub fn stored(&self) -> Option<TaskState> {
        self.storage.lock().unwrap().clone()
    }

    pub fn store(&self, state: TaskState) {
        *self.storage.lock().unwrap() = Some(state);
    }
}

impl ProviderFactory for MemoryFactory {
    fn provider(&self, environment: Option<CloudEnvironment>) -> Arc<dyn CloudProvider> {
        self.environments.lock().unwrap().push(environment);
        Arc::new(MemoryProvider {
            storage: self.storage.clone(),
            inits: self.inits.clone(),
            reject_init: self.reject_init,
        })
    }
}

pub struct MemoryProvider {
    storage: Storage,
    inits: Arc<Mutex<usize>>,
    reject_init: bool,
}

#[async_trait]
impl CloudProvider for MemoryProvider {
    async fn init(&self, _declaration: &Declaration) -> Result<()> {
        *self.inits.lock().unwrap() += 1;
        if self.reject_init {
            return Err(Error::provider_init("no credentials"));
        }
        Ok(())
    }

    async fn update_addresses(&self, _update: AddressUpdate) -> Result<Operation> {
        Ok(Operation::new())
    }

    async fn update_routes(&self, _update: RouteUpdate) -> Result<Operation> {
        Ok(Operation::new())
    }

    async fn download_data_from_storage(&self, _key: &str) -> Result<Option<TaskState>> {
        Ok(self.storage.lock().unwrap().clone())
    }

    async fn upload_data_to_storage(&self, _key: &str, state: &TaskState) -> Result<()> {
        *self.storage.lock().unwrap() = Some(state.clone());
        Ok(())
    }

    async fn get_associated_address_and_route_info(&self) -> Result<AssociatedInfo> {
        Ok(AssociatedInfo::default())
    }
}

/// Device owning traffic-group-1 with a single virtual address
pub struct StaticDevice;

#[async_trait]
impl TopologyReader for StaticDevice {
    async fn global_settings(&self) -> Result<Option<GlobalSettings>> {
        Ok(Some(GlobalSettings {
            hostname: HOSTNAME.to_string(),
        }))
    }

    async fn traffic_groups(&self) -> Result<Vec<TrafficGroupStatus>> {
        Ok(vec![TrafficGroupStatus::new(
            "traffic-group-1",
            HOSTNAME,
            "active",
        )])
    }

    async fn self_addresses(&self) -> Result<Vec<AddressObject>> {
        Ok(vec![AddressObject::self_ip("10.0.1.11", "local_only")])
    }

    async fn virtual_addresses(&self) -> Result<Vec<AddressObject>> {
        Ok(vec![AddressObject::virtual_address(
            "10.0.1.100",
            "traffic-group-1",
            "Common",
        )])
    }

    async fn snat_translation_addresses(&self) -> Result<Vec<AddressObject>> {
        Ok(Vec::new())
    }

    async fn nat_addresses(&self) -> Result<Vec<AddressObject>> {
        Ok(Vec::new())
    }
}
