//! Instance group contract and common types for the autoscaling host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::state::InstanceState;

/// Errors that can occur during instance group operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error reading configuration or key material.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid server specification. Carries every violation found, joined.
    #[error("Invalid server spec: {0}")]
    Config(String),

    /// The configured key material does not yield a public key.
    #[error("SSH key error: {0}")]
    Key(String),

    /// Instance is not in the state required for the operation.
    #[error("Instance {id} is in state {state}, expected AVAILABLE")]
    NotReady { id: String, state: String },

    /// Instance has no usable IP address on any network interface.
    #[error("Instance {0} has no reachable address")]
    NoAddress(String),

    /// Operation was cancelled before all items were attempted.
    #[error("Operation cancelled")]
    Cancelled,

    /// Combined per-item failures from a batched operation.
    #[error("{}", join_errors(.0))]
    Batch(Vec<ProviderError>),
}

fn join_errors(errors: &[ProviderError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Identity and limits of an instance group, reported once at startup.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    /// Provider-qualified group identifier (e.g. `ionos/gitlab-runner-cluster`).
    pub id: String,
    /// Upper bound on the number of instances the group will manage.
    pub max_size: usize,
    /// Provider version.
    pub version: String,
    /// Human-readable build description.
    pub build_info: String,
}

/// How the orchestrator should connect to instances of this group.
///
/// The provider does not interpret these fields; they are echoed back on
/// every [`ConnectInfo`] so the host can establish its own sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Target operating system (e.g. "linux").
    #[serde(default)]
    pub os: String,
    /// Connection protocol (e.g. "ssh").
    #[serde(default)]
    pub protocol: String,
    /// Login user on the instances.
    #[serde(default)]
    pub username: String,
    /// Whether credentials are static rather than provisioned per instance.
    #[serde(default)]
    pub use_static_credentials: bool,
    /// Path to the private key used both for connecting and for deriving the
    /// public key injected at boot.
    #[serde(default)]
    pub key_path: Option<std::path::PathBuf>,
}

/// Settings handed over by the autoscaling host at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Connection parameters for instances of this group.
    #[serde(default)]
    pub connector: ConnectorConfig,
}

/// Connection details for a single running instance.
#[derive(Debug, Clone)]
pub struct ConnectInfo {
    /// Provider-assigned instance identifier.
    pub id: String,
    /// Address reachable from inside the provider network.
    pub internal_addr: String,
    /// Address reachable from outside.
    pub external_addr: String,
    /// Connector settings, passed through from [`Settings`].
    pub connector: ConnectorConfig,
}

/// Trait for instance group providers driven by an autoscaling host.
///
/// The host serializes calls per group, but implementations must stay correct
/// under concurrent invocation. Batched operations (`increase`, `decrease`)
/// report partial success: the per-item outcome is independent, and the
/// combined error never hides how many items went through.
#[async_trait]
pub trait InstanceGroup: Send + Sync {
    /// Report group identity and limits. Must not touch any instances.
    async fn init(&self) -> Result<ProviderInfo, ProviderError>;

    /// Create `delta` new instances. Returns the number of creations that were
    /// accepted, plus one combined error covering every item that was not.
    async fn increase(
        &self,
        token: &CancellationToken,
        delta: usize,
    ) -> (usize, Option<ProviderError>);

    /// Delete the given instances. Returns the ids whose deletion was
    /// accepted, in input order, plus one combined error for the rest.
    /// An empty input is a no-op success.
    async fn decrease(
        &self,
        token: &CancellationToken,
        ids: Vec<String>,
    ) -> (Vec<String>, Option<ProviderError>);

    /// Sweep the current instance listing and report `(id, state)` once for
    /// every instance owned by this group. Instances without the group's name
    /// prefix are invisible to the host.
    async fn update(
        &self,
        callback: &mut (dyn for<'a> FnMut(&'a str, InstanceState) + Send),
    ) -> Result<(), ProviderError>;

    /// Resolve connection details for a running instance. Fails unless the
    /// instance is fully available.
    async fn connect_info(&self, id: &str) -> Result<ConnectInfo, ProviderError>;

    /// Release held resources. This provider holds none.
    async fn shutdown(&self) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_error_joins_messages() {
        let err = ProviderError::Batch(vec![
            ProviderError::Api {
                status: 429,
                message: "rate limited".to_string(),
            },
            ProviderError::NotFound("server 42".to_string()),
        ]);
        assert_eq!(
            err.to_string(),
            "API error: 429 - rate limited; Not found: server 42"
        );
    }

    #[test]
    fn test_connector_config_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(settings.connector.username.is_empty());
        assert!(settings.connector.key_path.is_none());
    }
}
