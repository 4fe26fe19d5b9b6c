//! Runtime settings and the agent wire messages.

use cloud_failover::{AddressUpdate, CloudEnvironment, Declaration, RouteUpdate, TaskState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen address
    pub listen_addr: String,

    /// Prefix all API routes are nested under
    pub base_path: String,

    /// Socket of the cloud provider agent
    pub provider_socket: PathBuf,

    /// Socket of the device agent
    pub device_socket: PathBuf,

    /// Bound on a single agent exchange
    pub request_timeout: Duration,

    /// Storage key of the task state record
    pub state_key: String,

    pub run_wait_interval: Duration,

    pub run_wait_attempts: u32,

    /// Last accepted declaration, reloaded on start
    pub declaration_path: Option<PathBuf>,

    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8100".to_string(),
            base_path: "/mgmt/shared/cloud-failover".to_string(),
            provider_socket: PathBuf::from("/var/run/cloud-failover/provider.sock"),
            device_socket: PathBuf::from("/var/run/cloud-failover/device.sock"),
            request_timeout: Duration::from_secs(60),
            state_key: cloud_failover::types::STATE_FILE_NAME.to_string(),
            run_wait_interval: Duration::from_secs(2),
            run_wait_attempts: 5,
            declaration_path: None,
            metrics_enabled: true,
        }
    }
}

/// Request sent to an agent, one JSON object per line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentRequest {
    /// Open a provider session for the declaration
    Init {
        environment: CloudEnvironment,
        declaration: Declaration,
    },

    UpdateAddresses {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        environment: Option<CloudEnvironment>,
        update: AddressUpdate,
    },

    UpdateRoutes {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        environment: Option<CloudEnvironment>,
        update: RouteUpdate,
    },

    DownloadData {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        environment: Option<CloudEnvironment>,
        key: String,
    },

    UploadData {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        environment: Option<CloudEnvironment>,
        key: String,
        data: TaskState,
    },

    AssociatedInfo {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        environment: Option<CloudEnvironment>,
    },

    // Device queries
    GlobalSettings,
    TrafficGroups,
    SelfAddresses,
    VirtualAddresses,
    SnatTranslationAddresses,
    NatAddresses,
}

impl AgentRequest {
    /// Wire name of the request, used in logs and errors
    pub fn op(&self) -> &'static str {
        match self {
            AgentRequest::Init { .. } => "init",
            AgentRequest::UpdateAddresses { .. } => "update_addresses",
            AgentRequest::UpdateRoutes { .. } => "update_routes",
            AgentRequest::DownloadData { .. } => "download_data",
            AgentRequest::UploadData { .. } => "upload_data",
            AgentRequest::AssociatedInfo { .. } => "associated_info",
            AgentRequest::GlobalSettings => "global_settings",
            AgentRequest::TrafficGroups => "traffic_groups",
            AgentRequest::SelfAddresses => "self_addresses",
            AgentRequest::VirtualAddresses => "virtual_addresses",
            AgentRequest::SnatTranslationAddresses => "snat_translation_addresses",
            AgentRequest::NatAddresses => "nat_addresses",
        }
    }
}

/// Agent reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AgentResponse {
    Ok {
        #[serde(default)]
        result: Value,
    },
    Error {
        message: String,
    },
}
