//! Failover data model: task state, address and route descriptors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::SystemTime;

/// Storage key of the shared task state record
pub const STATE_FILE_NAME: &str = "f5cloudfailoverstate.json";

/// Message written when a reconciliation cycle completes
pub const FAILOVER_COMPLETED_MESSAGE: &str = "Failover Completed Successfully";

/// Message written when the task state is reset
pub const STATE_FILE_RESET_MESSAGE: &str = "Failover state file was reset";

/// Message returned when a reset request asks for nothing
pub const NO_ACTION_MESSAGE: &str = "No action performed";

/// Traffic group tag for addresses that never float between nodes
pub const LOCAL_ONLY_TRAFFIC_GROUP: &str = "local_only";

/// Traffic group failover state owned by the active node
pub const ACTIVE_FAILOVER_STATE: &str = "active";

/// Reconciliation progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "RUNNING")]
    Run,
    #[default]
    #[serde(rename = "SUCCEEDED")]
    Pass,
    #[serde(rename = "FAILED")]
    Fail,
}

impl TaskStatus {
    /// Transport-facing status code for this state
    pub fn code(&self) -> u16 {
        match self {
            TaskStatus::Run => 202,
            TaskStatus::Pass => 200,
            TaskStatus::Fail => 400,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Run => write!(f, "RUNNING"),
            TaskStatus::Pass => write!(f, "SUCCEEDED"),
            TaskStatus::Fail => write!(f, "FAILED"),
        }
    }
}

/// Provider-defined change set produced by a discover call.
///
/// The core never looks inside; it is stored and handed back to the
/// provider unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Operation(Map<String, Value>);

impl Operation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; non-object values are stored under `value`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            Value::Null => Self::default(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Self(map)
            }
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Change sets computed by the last cycle, kept for replay after a failure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailoverOperations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Operation>,
}

impl FailoverOperations {
    pub fn is_empty(&self) -> bool {
        self.addresses.is_none() && self.routes.is_none()
    }
}

/// The single persisted record of reconciliation progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskState {
    #[serde(default)]
    pub task_state: TaskStatus,

    /// Node that last wrote the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    #[serde(default)]
    pub failover_operations: FailoverOperations,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub code: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Default for TaskState {
    fn default() -> Self {
        Self::initial()
    }
}

impl TaskState {
    fn new(task_state: TaskStatus, instance: Option<String>, message: impl Into<String>) -> Self {
        Self {
            task_state,
            instance,
            failover_operations: FailoverOperations::default(),
            message: message.into(),
            code: task_state.code(),
            timestamp: Some(humantime::format_rfc3339_seconds(SystemTime::now()).to_string()),
        }
    }

    /// Record synthesized when storage holds nothing yet
    pub fn initial() -> Self {
        Self {
            task_state: TaskStatus::Pass,
            instance: None,
            failover_operations: FailoverOperations::default(),
            message: String::new(),
            code: TaskStatus::Pass.code(),
            timestamp: None,
        }
    }

    pub fn running(instance: &str) -> Self {
        Self::new(TaskStatus::Run, Some(instance.to_string()), "Failover running")
    }

    pub fn passed(instance: &str) -> Self {
        Self::new(
            TaskStatus::Pass,
            Some(instance.to_string()),
            FAILOVER_COMPLETED_MESSAGE,
        )
    }

    pub fn failed(
        instance: &str,
        message: impl Into<String>,
        failover_operations: FailoverOperations,
    ) -> Self {
        let mut state = Self::new(TaskStatus::Fail, Some(instance.to_string()), message);
        state.failover_operations = failover_operations;
        state
    }

    pub fn reset() -> Self {
        Self::new(TaskStatus::Pass, None, STATE_FILE_RESET_MESSAGE)
    }

    /// Whether `hostname` is already executing a cycle
    pub fn is_running_on(&self, hostname: &str) -> bool {
        self.task_state == TaskStatus::Run && self.instance.as_deref() == Some(hostname)
    }

    /// Whether a failed cycle left operations to replay
    pub fn has_pending_operations(&self) -> bool {
        self.task_state == TaskStatus::Fail && !self.failover_operations.is_empty()
    }
}

/// Kind of device address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AddressKind {
    #[serde(rename = "self")]
    SelfIp,
    Virtual,
    SnatTranslation,
    #[serde(rename_all = "camelCase")]
    NatTranslation { originating_address: String },
}

/// Address read from device topology. For NAT entries `address` is the
/// translation address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressObject {
    pub address: String,
    pub traffic_group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    #[serde(flatten)]
    pub kind: AddressKind,
}

impl AddressObject {
    pub fn new(
        kind: AddressKind,
        address: impl Into<String>,
        traffic_group: impl Into<String>,
        partition: Option<&str>,
    ) -> Self {
        Self {
            address: address.into(),
            traffic_group: traffic_group.into(),
            partition: partition.map(str::to_string),
            kind,
        }
    }

    pub fn self_ip(address: &str, traffic_group: &str) -> Self {
        Self::new(AddressKind::SelfIp, address, traffic_group, None)
    }

    pub fn virtual_address(address: &str, traffic_group: &str, partition: &str) -> Self {
        Self::new(AddressKind::Virtual, address, traffic_group, Some(partition))
    }

    pub fn snat_translation(address: &str, traffic_group: &str, partition: &str) -> Self {
        Self::new(
            AddressKind::SnatTranslation,
            address,
            traffic_group,
            Some(partition),
        )
    }

    pub fn nat(
        originating_address: &str,
        translation_address: &str,
        traffic_group: &str,
        partition: &str,
    ) -> Self {
        Self::new(
            AddressKind::NatTranslation {
                originating_address: originating_address.to_string(),
            },
            translation_address,
            traffic_group,
            Some(partition),
        )
    }

    /// Address without route domain (`%N`) or prefix length (`/N`)
    pub fn bare_address(&self) -> &str {
        let end = self
            .address
            .find(['%', '/'])
            .unwrap_or(self.address.len());
        &self.address[..end]
    }

    pub fn is_local_only(&self) -> bool {
        self.traffic_group == LOCAL_ONLY_TRAFFIC_GROUP
    }
}

/// Traffic group ownership as reported by the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficGroupStatus {
    pub name: String,
    pub device_name: String,
    pub failover_state: String,
}

impl TrafficGroupStatus {
    pub fn new(name: &str, device_name: &str, failover_state: &str) -> Self {
        Self {
            name: name.to_string(),
            device_name: device_name.to_string(),
            failover_state: failover_state.to_string(),
        }
    }

    /// Whether `hostname` is the active owner. Device names may be given as
    /// a path such as `/Common/host`.
    pub fn is_active_on(&self, hostname: &str) -> bool {
        if self.failover_state != ACTIVE_FAILOVER_STATE || hostname.is_empty() {
            return false;
        }
        self.device_name == hostname || self.device_name.rsplit('/').next() == Some(hostname)
    }
}

/// Device-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub hostname: String,
}

/// Route descriptor as reported by a provider, keyed by destination and
/// next hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteObject {
    pub destination: String,
    pub next_hop: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_group: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Provider view of currently associated addresses and routes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssociatedInfo {
    #[serde(default)]
    pub addresses: Vec<Value>,
    #[serde(default)]
    pub routes: Vec<RouteObject>,
}

/// Traffic group name entry in the inspect response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficGroupName {
    pub name: String,
}

/// Result of `getFailoverStatusAndObjects`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailoverStatus {
    pub addresses: Vec<Value>,
    pub routes: Vec<RouteObject>,
    pub host_name: String,
    pub device_status: String,
    pub traffic_group: Vec<TrafficGroupName>,
}

/// Body of a reset request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    #[serde(default)]
    pub reset_state_file: bool,
}

/// Result of a reset request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetResponse {
    pub message: String,
}
