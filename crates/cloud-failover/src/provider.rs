//! Cloud provider capability interface.

use crate::declaration::Declaration;
use crate::types::{AssociatedInfo, Operation, TaskState};
use async_trait::async_trait;
use common::Result;
use serde::{Deserialize, Serialize};

/// Arguments of an address update.
///
/// Discover mode carries the address sets and `discover_only = true`; apply
/// mode carries only the operation returned by discovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressUpdate {
    #[serde(default)]
    pub local_addresses: Vec<String>,

    #[serde(default)]
    pub failover_addresses: Vec<String>,

    #[serde(default)]
    pub discover_only: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_operations: Option<Operation>,
}

impl AddressUpdate {
    pub fn discover(local_addresses: Vec<String>, failover_addresses: Vec<String>) -> Self {
        Self {
            local_addresses,
            failover_addresses,
            discover_only: true,
            update_operations: None,
        }
    }

    pub fn apply(operation: Operation) -> Self {
        Self {
            update_operations: Some(operation),
            ..Self::default()
        }
    }
}

/// Arguments of a route update; routes are resolved by next hop so only the
/// local addresses are needed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteUpdate {
    #[serde(default)]
    pub local_addresses: Vec<String>,

    #[serde(default)]
    pub discover_only: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_operations: Option<Operation>,
}

impl RouteUpdate {
    pub fn discover(local_addresses: Vec<String>) -> Self {
        Self {
            local_addresses,
            discover_only: true,
            update_operations: None,
        }
    }

    pub fn apply(operation: Operation) -> Self {
        Self {
            update_operations: Some(operation),
            ..Self::default()
        }
    }
}

/// Uniform contract over provider-specific address, route and storage APIs.
///
/// Implementations report failures with the matching error variant:
/// `ProviderInit`, `ProviderAddress`, `ProviderRoute` or `Storage`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Prepare the provider session for `declaration`
    async fn init(&self, declaration: &Declaration) -> Result<()>;

    /// Discover (when `discover_only`) or apply an address change set
    async fn update_addresses(&self, update: AddressUpdate) -> Result<Operation>;

    /// Discover (when `discover_only`) or apply a route change set
    async fn update_routes(&self, update: RouteUpdate) -> Result<Operation>;

    /// Read the task state stored under `key`; `None` when absent
    async fn download_data_from_storage(&self, key: &str) -> Result<Option<TaskState>>;

    /// Replace the task state stored under `key`
    async fn upload_data_to_storage(&self, key: &str, state: &TaskState) -> Result<()>;

    /// Addresses and routes currently associated with this node
    async fn get_associated_address_and_route_info(&self) -> Result<AssociatedInfo>;
}
