//! `CloudProvider` and `TopologyReader` implementations backed by agents.

use crate::agent::{AgentClient, AgentError};
use crate::state::ProviderFactory;
use crate::types::AgentRequest;
use async_trait::async_trait;
use cloud_failover::{
    AddressObject, AddressUpdate, AssociatedInfo, CloudEnvironment, CloudProvider, Declaration,
    GlobalSettings, Operation, RouteUpdate, TaskState, TopologyReader, TrafficGroupStatus,
};
use common::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// Cloud provider variant served by the provider agent.
///
/// The environment is fixed at construction and sent with every request so
/// the agent dispatches to the matching cloud SDK.
pub struct SidecarProvider {
    client: AgentClient,
    environment: Option<CloudEnvironment>,
}

impl SidecarProvider {
    pub fn new(client: AgentClient, environment: Option<CloudEnvironment>) -> Self {
        Self {
            client,
            environment,
        }
    }

    pub fn environment(&self) -> Option<CloudEnvironment> {
        self.environment
    }
}

#[async_trait]
impl CloudProvider for SidecarProvider {
    async fn init(&self, declaration: &Declaration) -> Result<()> {
        let environment = declaration.require_environment()?;
        self.client
            .call::<Value>(&AgentRequest::Init {
                environment,
                declaration: declaration.clone(),
            })
            .await
            .map_err(Error::provider_init)?;
        Ok(())
    }

    async fn update_addresses(&self, update: AddressUpdate) -> Result<Operation> {
        let result = self
            .client
            .call::<Value>(&AgentRequest::UpdateAddresses {
                environment: self.environment,
                update,
            })
            .await
            .map_err(Error::provider_address)?;
        Ok(Operation::from_value(result))
    }

    async fn update_routes(&self, update: RouteUpdate) -> Result<Operation> {
        let result = self
            .client
            .call::<Value>(&AgentRequest::UpdateRoutes {
                environment: self.environment,
                update,
            })
            .await
            .map_err(Error::provider_route)?;
        Ok(Operation::from_value(result))
    }

    async fn download_data_from_storage(&self, key: &str) -> Result<Option<TaskState>> {
        self.client
            .call(&AgentRequest::DownloadData {
                environment: self.environment,
                key: key.to_string(),
            })
            .await
            .map_err(Error::storage)
    }

    async fn upload_data_to_storage(&self, key: &str, state: &TaskState) -> Result<()> {
        self.client
            .call::<Value>(&AgentRequest::UploadData {
                environment: self.environment,
                key: key.to_string(),
                data: state.clone(),
            })
            .await
            .map_err(Error::storage)?;
        Ok(())
    }

    async fn get_associated_address_and_route_info(&self) -> Result<AssociatedInfo> {
        self.client
            .call(&AgentRequest::AssociatedInfo {
                environment: self.environment,
            })
            .await
            .map_err(Error::provider_address)
    }
}

/// Builds one [`SidecarProvider`] per declaration
pub struct SidecarFactory {
    client: AgentClient,
}

impl SidecarFactory {
    pub fn new(client: AgentClient) -> Self {
        Self { client }
    }
}

impl ProviderFactory for SidecarFactory {
    fn provider(&self, environment: Option<CloudEnvironment>) -> Arc<dyn CloudProvider> {
        Arc::new(SidecarProvider::new(self.client.clone(), environment))
    }
}

/// Device topology served by the device agent
pub struct DeviceAgent {
    client: AgentClient,
}

impl DeviceAgent {
    pub fn new(client: AgentClient) -> Self {
        Self { client }
    }

    async fn query<T: serde::de::DeserializeOwned>(&self, request: AgentRequest) -> Result<T> {
        self.client
            .call(&request)
            .await
            .map_err(|e: AgentError| Error::device_query(format!("{}: {}", request.op(), e)))
    }
}

#[async_trait]
impl TopologyReader for DeviceAgent {
    async fn global_settings(&self) -> Result<Option<GlobalSettings>> {
        self.query(AgentRequest::GlobalSettings).await
    }

    async fn traffic_groups(&self) -> Result<Vec<TrafficGroupStatus>> {
        self.query(AgentRequest::TrafficGroups).await
    }

    async fn self_addresses(&self) -> Result<Vec<AddressObject>> {
        self.query(AgentRequest::SelfAddresses).await
    }

    async fn virtual_addresses(&self) -> Result<Vec<AddressObject>> {
        self.query(AgentRequest::VirtualAddresses).await
    }

    async fn snat_translation_addresses(&self) -> Result<Vec<AddressObject>> {
        self.query(AgentRequest::SnatTranslationAddresses).await
    }

    async fn nat_addresses(&self) -> Result<Vec<AddressObject>> {
        self.query(AgentRequest::NatAddresses).await
    }
}
