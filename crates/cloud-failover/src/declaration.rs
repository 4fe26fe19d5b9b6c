//! The failover declaration consumed by the orchestrator.
//!
//! Accepting and storing declarations happens in the server; this module only
//! defines the shape and the checks the core relies on.

use common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// Only accepted declaration class
pub const DECLARATION_CLASS: &str = "Cloud_Failover";

/// Schema versions accepted, newest first
pub const SCHEMA_VERSIONS: &[&str] = &["1.1.0", "1.0.0", "0.9.1"];

/// Cloud the appliances run in; selects the provider variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudEnvironment {
    Aws,
    Azure,
    Gcp,
}

impl fmt::Display for CloudEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudEnvironment::Aws => write!(f, "aws"),
            CloudEnvironment::Azure => write!(f, "azure"),
            CloudEnvironment::Gcp => write!(f, "gcp"),
        }
    }
}

impl FromStr for CloudEnvironment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(CloudEnvironment::Aws),
            "azure" => Ok(CloudEnvironment::Azure),
            "gcp" => Ok(CloudEnvironment::Gcp),
            other => Err(Error::validation(format!("unsupported environment '{}'", other))),
        }
    }
}

/// Tags that select the cloud resources a section applies to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScopingTags {
    #[validate(custom = "validate_tags")]
    #[serde(default)]
    pub scoping_tags: BTreeMap<String, String>,
}

/// Route section of the declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RouteScope {
    #[validate(custom = "validate_tags")]
    #[serde(default)]
    pub scoping_tags: BTreeMap<String, String>,

    #[serde(default)]
    pub scoping_address_ranges: Vec<AddressRange>,
}

/// Destination range whose routes follow the active node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRange {
    pub range: String,
}

/// Runtime controls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Controls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    #[validate(custom = "validate_log_level")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// Failover declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    #[validate(custom = "validate_class")]
    pub class: String,

    #[validate(custom = "validate_schema_version")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<CloudEnvironment>,

    #[validate]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_storage: Option<ScopingTags>,

    #[validate]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover_addresses: Option<ScopingTags>,

    #[validate]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover_routes: Option<RouteScope>,

    #[validate]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controls: Option<Controls>,
}

impl Declaration {
    /// Minimal declaration for `environment`
    pub fn new(environment: CloudEnvironment) -> Self {
        Self {
            class: DECLARATION_CLASS.to_string(),
            schema_version: None,
            environment: Some(environment),
            external_storage: None,
            failover_addresses: None,
            failover_routes: None,
            controls: None,
        }
    }

    /// Parse and validate a declaration body
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let declaration: Declaration =
            serde_json::from_value(value).map_err(Error::validation)?;
        declaration.validate().map_err(Error::validation)?;
        Ok(declaration)
    }

    /// Environment the orchestrator must run against
    pub fn require_environment(&self) -> Result<CloudEnvironment> {
        self.environment
            .ok_or_else(|| Error::config("Environment not provided"))
    }

    pub fn log_level(&self) -> Option<&str> {
        self.controls.as_ref().and_then(|c| c.log_level.as_deref())
    }
}

fn validate_class(class: &str) -> std::result::Result<(), ValidationError> {
    if class != DECLARATION_CLASS {
        return Err(ValidationError::new("declaration_class_invalid"));
    }
    Ok(())
}

fn validate_schema_version(version: &str) -> std::result::Result<(), ValidationError> {
    if !SCHEMA_VERSIONS.contains(&version) {
        return Err(ValidationError::new("schema_version_unsupported"));
    }
    Ok(())
}

fn validate_tags(tags: &BTreeMap<String, String>) -> std::result::Result<(), ValidationError> {
    if tags.keys().any(|k| k.trim().is_empty()) {
        return Err(ValidationError::new("scoping_tag_key_empty"));
    }
    Ok(())
}

fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level {
        "error" | "warning" | "info" | "debug" | "verbose" | "silly" => Ok(()),
        _ => Err(ValidationError::new("log_level_invalid")),
    }
}
