//! Cloud failover server.
//!
//! Hosts the failover orchestrator behind an HTTP API and connects it to
//! two agents over Unix sockets:
//! - the provider agent, which performs cloud API calls and state storage
//! - the device agent, which answers topology queries about the local device
//!
//! Both speak newline-delimited JSON, one request per connection.
//!
//! # Components
//!
//! - **AgentClient**: request/response exchange with an agent
//! - **SidecarProvider / DeviceAgent**: the core's provider and topology
//!   traits implemented on top of the agents
//! - **AppState**: active declaration and the orchestrator built from it
//! - **ApiServer**: declare, trigger, reset, inspect and info endpoints

pub mod agent;
pub mod config;
pub mod http_server;
pub mod metrics;
pub mod server;
pub mod sidecar;
pub mod state;
pub mod types;

pub use agent::{AgentClient, AgentError};
pub use config::{Config, ConfigError};
pub use http_server::{ApiServer, router};
pub use metrics::MetricsRegistry;
pub use server::FailoverServer;
pub use sidecar::{DeviceAgent, SidecarFactory, SidecarProvider};
pub use state::{AppState, ProviderFactory};
pub use types::ServerConfig;
