//! Recording fakes shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use cloud_failover::{
    AddressObject, AddressUpdate, AssociatedInfo, CloudProvider, Declaration, GlobalSettings,
    Operation, RouteUpdate, TaskState, TaskStatus, TopologyReader, TrafficGroupStatus,
};
use common::{Error, Result};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub const HOSTNAME: &str = "some_hostname";

/// Which provider call should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Init,
    AddressDiscover,
    AddressApply,
    RouteDiscover,
    RouteApply,
    Upload,
    /// Only uploads of a FAILED record
    FailedUpload,
}

/// Cloud provider fake that records every call.
///
/// Downloads pop from a queue; once a single entry remains it is returned
/// for every later read.
pub struct FakeProvider {
    downloads: Mutex<VecDeque<Option<TaskState>>>,
    uploads: Mutex<Vec<(String, TaskState)>>,
    address_calls: Mutex<Vec<AddressUpdate>>,
    route_calls: Mutex<Vec<RouteUpdate>>,
    init_calls: Mutex<usize>,
    failures: Mutex<Vec<Failure>>,
    /// Completed address and route calls across both kinds, in order
    events: Mutex<Vec<&'static str>>,
    route_discover_delay: Option<Duration>,
    address_operation: Operation,
    route_operation: Operation,
    pub associated: AssociatedInfo,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            downloads: Mutex::new(VecDeque::from([None])),
            uploads: Mutex::new(Vec::new()),
            address_calls: Mutex::new(Vec::new()),
            route_calls: Mutex::new(Vec::new()),
            init_calls: Mutex::new(0),
            failures: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            route_discover_delay: None,
            address_operation: Operation::new()
                .with_field("disassociate", json!([]))
                .with_field("associate", json!([["eni-1", "2.2.2.2"]])),
            route_operation: Operation::new().with_field("operations", json!([])),
            associated: AssociatedInfo::default(),
        }
    }
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve these states to successive downloads
    pub fn with_downloads(self, states: Vec<Option<TaskState>>) -> Self {
        *self.downloads.lock().unwrap() = states.into();
        self
    }

    pub fn with_stored(self, state: TaskState) -> Self {
        self.with_downloads(vec![Some(state)])
    }

    pub fn failing(self, failure: Failure) -> Self {
        self.failures.lock().unwrap().push(failure);
        self
    }

    /// Route discovery completes only after `delay`
    pub fn with_route_discover_delay(mut self, delay: Duration) -> Self {
        self.route_discover_delay = Some(delay);
        self
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    pub fn address_operation(&self) -> Operation {
        self.address_operation.clone()
    }

    pub fn route_operation(&self) -> Operation {
        self.route_operation.clone()
    }

    pub fn uploads(&self) -> Vec<TaskState> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn init_calls(&self) -> usize {
        *self.init_calls.lock().unwrap()
    }

    pub fn upload_keys(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn address_calls(&self) -> Vec<AddressUpdate> {
        self.address_calls.lock().unwrap().clone()
    }

    pub fn route_calls(&self) -> Vec<RouteUpdate> {
        self.route_calls.lock().unwrap().clone()
    }

    fn fails(&self, failure: Failure) -> bool {
        self.failures.lock().unwrap().contains(&failure)
    }
}

#[async_trait]
impl CloudProvider for FakeProvider {
    async fn init(&self, _declaration: &Declaration) -> Result<()> {
        *self.init_calls.lock().unwrap() += 1;
        if self.fails(Failure::Init) {
            return Err(Error::provider_init("credentials rejected"));
        }
        Ok(())
    }

    async fn update_addresses(&self, update: AddressUpdate) -> Result<Operation> {
        let discover = update.discover_only;
        self.address_calls.lock().unwrap().push(update);
        self.events.lock().unwrap().push(if discover {
            "address_discover"
        } else {
            "address_apply"
        });
        if discover && self.fails(Failure::AddressDiscover) {
            return Err(Error::provider_address("describe addresses failed"));
        }
        if !discover && self.fails(Failure::AddressApply) {
            return Err(Error::provider_address("associate address failed"));
        }
        Ok(if discover {
            self.address_operation.clone()
        } else {
            Operation::new()
        })
    }

    async fn update_routes(&self, update: RouteUpdate) -> Result<Operation> {
        let discover = update.discover_only;
        self.route_calls.lock().unwrap().push(update);
        if let (true, Some(delay)) = (discover, self.route_discover_delay) {
            tokio::time::sleep(delay).await;
        }
        self.events.lock().unwrap().push(if discover {
            "route_discover"
        } else {
            "route_apply"
        });
        if discover && self.fails(Failure::RouteDiscover) {
            return Err(Error::provider_route("describe route tables failed"));
        }
        if !discover && self.fails(Failure::RouteApply) {
            return Err(Error::provider_route("replace route failed"));
        }
        Ok(if discover {
            self.route_operation.clone()
        } else {
            Operation::new()
        })
    }

    async fn download_data_from_storage(&self, _key: &str) -> Result<Option<TaskState>> {
        let mut downloads = self.downloads.lock().unwrap();
        if downloads.len() > 1 {
            Ok(downloads.pop_front().flatten())
        } else {
            Ok(downloads.front().cloned().flatten())
        }
    }

    async fn upload_data_to_storage(&self, key: &str, state: &TaskState) -> Result<()> {
        if self.fails(Failure::Upload)
            || (self.fails(Failure::FailedUpload)
                && state.task_state == TaskStatus::Fail)
        {
            return Err(Error::storage("bucket unreachable"));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), state.clone()));
        // Later reads observe the write
        *self.downloads.lock().unwrap() = VecDeque::from([Some(state.clone())]);
        Ok(())
    }

    async fn get_associated_address_and_route_info(&self) -> Result<AssociatedInfo> {
        Ok(self.associated.clone())
    }
}

/// Device fake with a mutable snapshot
pub struct FakeTopology {
    pub hostname: Option<String>,
    pub traffic_groups: Vec<TrafficGroupStatus>,
    pub self_addresses: Vec<AddressObject>,
    pub virtual_addresses: Vec<AddressObject>,
    pub snat_translation_addresses: Vec<AddressObject>,
    pub nat_addresses: Vec<AddressObject>,
}

impl Default for FakeTopology {
    /// One local-only self IP, one virtual address in an owned group
    fn default() -> Self {
        Self {
            hostname: Some(HOSTNAME.to_string()),
            traffic_groups: vec![TrafficGroupStatus::new(
                "traffic-group-1",
                HOSTNAME,
                "active",
            )],
            self_addresses: vec![AddressObject::self_ip("1.1.1.1", "local_only")],
            virtual_addresses: vec![AddressObject::virtual_address(
                "2.2.2.2",
                "traffic-group-1",
                "Common",
            )],
            snat_translation_addresses: Vec::new(),
            nat_addresses: Vec::new(),
        }
    }
}

#[async_trait]
impl TopologyReader for FakeTopology {
    async fn global_settings(&self) -> Result<Option<GlobalSettings>> {
        Ok(self.hostname.clone().map(|hostname| GlobalSettings { hostname }))
    }

    async fn traffic_groups(&self) -> Result<Vec<TrafficGroupStatus>> {
        Ok(self.traffic_groups.clone())
    }

    async fn self_addresses(&self) -> Result<Vec<AddressObject>> {
        Ok(self.self_addresses.clone())
    }

    async fn virtual_addresses(&self) -> Result<Vec<AddressObject>> {
        Ok(self.virtual_addresses.clone())
    }

    async fn snat_translation_addresses(&self) -> Result<Vec<AddressObject>> {
        Ok(self.snat_translation_addresses.clone())
    }

    async fn nat_addresses(&self) -> Result<Vec<AddressObject>> {
        Ok(self.nat_addresses.clone())
    }
}
