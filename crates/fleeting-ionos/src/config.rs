//! Instance group configuration and server specification.
//!
//! The configuration is loaded once from a JSON file at startup and never
//! mutated afterwards. Compute API credentials are not part of it; they come
//! from the environment (see [`crate::compute::ComputeClient::from_env`]).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::provider::ProviderError;

/// Instance group configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceGroupConfig {
    /// Base name for the group. Doubles as the ownership prefix: every
    /// instance is named `<name>-<index>`, and only instances whose name
    /// starts with this prefix are reported to the host.
    pub name: String,
    /// UUID of the IONOS datacenter all instances live in.
    pub datacenter_id: String,
    /// Hardware and software template applied to every new instance.
    pub server_spec: ServerSpec,
}

impl InstanceGroupConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Provisioning mode for new servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerType {
    /// Custom-sized server: cores, RAM and boot volume size are chosen freely.
    #[serde(rename = "ENTERPRISE")]
    Enterprise,
    /// Fixed-shape server provisioned from a template.
    #[serde(rename = "CUBE")]
    Cube,
}

impl std::fmt::Display for ServerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enterprise => write!(f, "ENTERPRISE"),
            Self::Cube => write!(f, "CUBE"),
        }
    }
}

/// Server specification applied on every scale-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSpec {
    /// Provisioning mode. Decides which of the sizing fields below apply.
    #[serde(rename = "type")]
    pub server_type: ServerType,

    /// CUBE: template UUID. Wins over `template_name` when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// CUBE: template name, resolved to a UUID via the template listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,

    /// ENTERPRISE: number of CPU cores.
    #[serde(default)]
    pub cores: u32,
    /// ENTERPRISE: RAM in MB.
    #[serde(default)]
    pub ram: u32,
    /// ENTERPRISE: boot volume size in GB.
    #[serde(default)]
    pub storage_size: u32,

    /// LAN the public-facing NIC attaches to.
    pub public_lan_id: u32,
    /// LAN the internal NIC attaches to.
    pub private_lan_id: u32,

    /// Cloud-init payload, transmitted base64-encoded on the boot volume.
    pub user_data: String,
    /// Storage backend class of the boot volume (e.g. "DAS", "SSD").
    pub volume_type: String,
    /// OS image for the boot volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ServerSpec {
    /// Check the spec for internal consistency before any request is issued.
    ///
    /// Collects every violation rather than stopping at the first, so a bad
    /// config surfaces completely in one pass. Any violation aborts the whole
    /// scale-up with zero instances created.
    ///
    /// # Errors
    /// Returns [`ProviderError::Config`] listing all violations.
    pub fn validate(&self) -> Result<(), ProviderError> {
        let mut violations = Vec::new();

        if self.public_lan_id == 0 {
            violations.push("public_lan_id must be set".to_string());
        }
        if self.private_lan_id == 0 {
            violations.push("private_lan_id must be set".to_string());
        }
        if self.user_data.is_empty() {
            violations.push("user_data must not be empty".to_string());
        }
        if self.volume_type.is_empty() {
            violations.push("volume_type must not be empty".to_string());
        }

        match self.server_type {
            ServerType::Cube => {
                let has_template = self.template_id.as_deref().is_some_and(|t| !t.is_empty())
                    || self.template_name.as_deref().is_some_and(|t| !t.is_empty());
                if !has_template {
                    violations
                        .push("CUBE requires template_id or template_name".to_string());
                }
            }
            ServerType::Enterprise => {
                if self.cores == 0 {
                    violations.push("ENTERPRISE requires cores".to_string());
                }
                if self.ram == 0 {
                    violations.push("ENTERPRISE requires ram".to_string());
                }
                if self.storage_size == 0 {
                    violations.push("ENTERPRISE requires storage_size".to_string());
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Config(violations.join("; ")))
        }
    }
}
