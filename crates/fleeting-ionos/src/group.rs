//! The IONOS instance group: reconciles pool size against the Cloud API.
//!
//! The group keeps no durable record of the instances it created. Membership
//! is re-derived on every sweep from the provider's listing, filtered by the
//! group's name prefix. The only in-memory state is the instance counter
//! (name uniqueness within one run) and the set of ids with an outstanding
//! delete (needed to disambiguate the provider's BUSY state).

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::stream::{self, StreamExt};
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::compute::models::{
    CreateItems, CreateNic, CreateNicProperties, CreateServer, CreateServerEntities,
    CreateServerProperties, CreateVolume, CreateVolumeProperties, Nic,
};
use crate::compute::ComputeClient;
use crate::config::{InstanceGroupConfig, ServerSpec, ServerType};
use crate::keys;
use crate::provider::{
    ConnectInfo, InstanceGroup, ProviderError, ProviderInfo, Settings,
};
use crate::state::{map_vm_state, InstanceState, VM_STATE_AVAILABLE};

/// Upper bound reported to the orchestrator.
const MAX_GROUP_SIZE: usize = 1000;

/// Concurrent in-flight provider calls per batch operation.
const MAX_IN_FLIGHT: usize = 4;

/// Listing depth that includes NIC and volume sub-resources plus metadata.
const LIST_DEPTH: u8 = 2;

/// NIC names written at creation and read back when resolving connection
/// info. The "public"/"private" prefixes are the contract; do not rename.
const PUBLIC_NIC_NAME: &str = "publicNIC";
const PRIVATE_NIC_NAME: &str = "privateNIC";

/// Outcome of one item in a batched operation.
enum ItemOutcome {
    Ok,
    Failed(ProviderError),
    Skipped,
}

/// Instance group backed by IONOS Cloud servers.
pub struct IonosInstanceGroup {
    config: InstanceGroupConfig,
    settings: Settings,
    client: ComputeClient,
    /// Public half of the connector key, injected onto every boot volume.
    public_key: Option<String>,
    /// Monotone per-run counter; see [`instance_name`]. Not durable across
    /// restarts, so names are only unique within one controller lifetime.
    instance_counter: AtomicU64,
    /// Template UUID resolved from `template_name`, at most once per run.
    template_uuid: OnceCell<String>,
    /// Ids this group has issued a delete for and that are still listed.
    pending_delete: Mutex<HashSet<String>>,
}

impl IonosInstanceGroup {
    /// Create a group using credentials from the process environment.
    ///
    /// # Errors
    /// Returns error if credentials are missing or the configured key
    /// material yields no public key.
    pub fn new(config: InstanceGroupConfig, settings: Settings) -> Result<Self, ProviderError> {
        let client = ComputeClient::from_env()?;
        Self::with_client(config, settings, client)
    }

    /// Create a group against an explicit API client.
    ///
    /// # Errors
    /// Returns error if the configured key material yields no public key.
    pub fn with_client(
        config: InstanceGroupConfig,
        settings: Settings,
        client: ComputeClient,
    ) -> Result<Self, ProviderError> {
        let public_key = settings
            .connector
            .key_path
            .as_deref()
            .map(keys::public_key_for)
            .transpose()?;

        Ok(Self {
            config,
            settings,
            client,
            public_key,
            instance_counter: AtomicU64::new(0),
            template_uuid: OnceCell::new(),
            pending_delete: Mutex::new(HashSet::new()),
        })
    }

    /// Resolve the template UUID for CUBE specs, caching the lookup for the
    /// lifetime of the group. An explicit `template_id` wins and skips the
    /// listing entirely.
    async fn template_uuid(&self) -> Result<Option<String>, ProviderError> {
        let spec = &self.config.server_spec;
        match spec.server_type {
            ServerType::Enterprise => Ok(None),
            ServerType::Cube => {
                if let Some(id) = spec.template_id.as_deref().filter(|id| !id.is_empty()) {
                    return Ok(Some(id.to_string()));
                }
                let name = spec
                    .template_name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| {
                        ProviderError::Config(
                            "CUBE requires template_id or template_name".to_string(),
                        )
                    })?;
                let id = self
                    .template_uuid
                    .get_or_try_init(|| self.client.resolve_template(name))
                    .await?;
                Ok(Some(id.clone()))
            }
        }
    }
}

/// Deterministic instance name for a given index.
fn instance_name(prefix: &str, index: u64) -> String {
    format!("{prefix}-{index}")
}

/// Translate the server spec into a creation request. Pure; collisions are
/// prevented only by counter monotonicity, not by querying existing names.
fn build_create_request(
    spec: &ServerSpec,
    name: &str,
    template_uuid: Option<String>,
    public_key: Option<&str>,
) -> CreateServer {
    let (cores, ram, storage_size) = match spec.server_type {
        ServerType::Enterprise => (Some(spec.cores), Some(spec.ram), Some(spec.storage_size)),
        ServerType::Cube => (None, None, None),
    };

    CreateServer {
        properties: CreateServerProperties {
            name: name.to_string(),
            server_type: spec.server_type.to_string(),
            template_uuid,
            cores,
            ram,
        },
        entities: CreateServerEntities {
            volumes: CreateItems {
                items: vec![CreateVolume {
                    properties: CreateVolumeProperties {
                        volume_type: spec.volume_type.clone(),
                        size: storage_size,
                        image: spec.image.clone(),
                        user_data: BASE64.encode(&spec.user_data),
                        ssh_keys: public_key.map(|key| vec![key.to_string()]),
                    },
                }],
            },
            nics: CreateItems {
                items: vec![
                    CreateNic {
                        properties: CreateNicProperties {
                            name: PUBLIC_NIC_NAME.to_string(),
                            lan: spec.public_lan_id,
                        },
                    },
                    CreateNic {
                        properties: CreateNicProperties {
                            name: PRIVATE_NIC_NAME.to_string(),
                            lan: spec.private_lan_id,
                        },
                    },
                ],
            },
        },
    }
}

/// Pick the external and internal address from a server's NICs by the
/// creation-time naming contract. A sole unnamed interface serves as both.
fn extract_addresses(nics: &[Nic]) -> (Option<String>, Option<String>) {
    let mut external = None;
    let mut internal = None;
    let mut fallback = None;

    for nic in nics {
        let Some(ip) = nic.properties.ips.first() else {
            continue;
        };
        let name = nic.properties.name.as_deref().unwrap_or_default();
        if name.starts_with("public") {
            external.get_or_insert_with(|| ip.clone());
        } else if name.starts_with("private") {
            internal.get_or_insert_with(|| ip.clone());
        } else {
            fallback.get_or_insert_with(|| ip.clone());
        }
    }

    if external.is_none() && internal.is_none() {
        (fallback.clone(), fallback)
    } else {
        (external, internal)
    }
}

/// Join per-item errors into a single combined error.
fn combine_errors(mut errors: Vec<ProviderError>) -> Option<ProviderError> {
    match errors.len() {
        0 => None,
        1 => Some(errors.remove(0)),
        _ => Some(ProviderError::Batch(errors)),
    }
}

#[async_trait]
impl InstanceGroup for IonosInstanceGroup {
    async fn init(&self) -> Result<ProviderInfo, ProviderError> {
        Ok(ProviderInfo {
            id: format!("ionos/{}", self.config.name),
            max_size: MAX_GROUP_SIZE,
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_info: concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
                .to_string(),
        })
    }

    async fn increase(
        &self,
        token: &CancellationToken,
        delta: usize,
    ) -> (usize, Option<ProviderError>) {
        let spec = &self.config.server_spec;
        if let Err(e) = spec.validate() {
            return (0, Some(e));
        }
        // Resolve once, before the loop: a failed lookup creates nothing.
        let template_uuid = match self.template_uuid().await {
            Ok(t) => t,
            Err(e) => return (0, Some(e)),
        };

        let outcomes: Vec<ItemOutcome> = stream::iter((0..delta).map(|_| {
            let template_uuid = template_uuid.clone();
            async move {
                if token.is_cancelled() {
                    return ItemOutcome::Skipped;
                }
                // The counter advances once per attempt, even if the create
                // below is rejected.
                let index = self.instance_counter.fetch_add(1, Ordering::Relaxed) + 1;
                let name = instance_name(&self.config.name, index);
                let request =
                    build_create_request(spec, &name, template_uuid, self.public_key.as_deref());

                match self
                    .client
                    .create_server(&self.config.datacenter_id, &request)
                    .await
                {
                    Ok(server) => {
                        info!(server_id = %server.id, name = %name, "Instance creation request accepted");
                        ItemOutcome::Ok
                    }
                    Err(e) => {
                        error!(error = %e, name = %name, "Failed to create instance");
                        ItemOutcome::Failed(e)
                    }
                }
            }
        }))
        .buffer_unordered(MAX_IN_FLIGHT)
        .collect()
        .await;

        let mut succeeded = 0;
        let mut errors = Vec::new();
        let mut cancelled = false;
        for outcome in outcomes {
            match outcome {
                ItemOutcome::Ok => succeeded += 1,
                ItemOutcome::Failed(e) => errors.push(e),
                ItemOutcome::Skipped => cancelled = true,
            }
        }
        if cancelled {
            errors.push(ProviderError::Cancelled);
        }

        info!(delta, succeeded, "Increase complete");
        (succeeded, combine_errors(errors))
    }

    async fn decrease(
        &self,
        token: &CancellationToken,
        ids: Vec<String>,
    ) -> (Vec<String>, Option<ProviderError>) {
        if ids.is_empty() {
            return (Vec::new(), None);
        }

        let outcomes: Vec<(usize, ItemOutcome)> =
            stream::iter(ids.iter().cloned().enumerate().map(|(i, id)| async move {
                if token.is_cancelled() {
                    return (i, ItemOutcome::Skipped);
                }
                match self
                    .client
                    .delete_server(&self.config.datacenter_id, &id)
                    .await
                {
                    Ok(()) => {
                        info!(server_id = %id, "Instance deletion request accepted");
                        (i, ItemOutcome::Ok)
                    }
                    Err(e) => {
                        error!(error = %e, server_id = %id, "Failed to delete instance");
                        (i, ItemOutcome::Failed(e))
                    }
                }
            }))
            .buffer_unordered(MAX_IN_FLIGHT)
            .collect()
            .await;

        let mut deleted = vec![false; ids.len()];
        let mut errors = Vec::new();
        let mut cancelled = false;
        for (i, outcome) in outcomes {
            match outcome {
                ItemOutcome::Ok => deleted[i] = true,
                ItemOutcome::Failed(e) => errors.push(e),
                ItemOutcome::Skipped => cancelled = true,
            }
        }
        if cancelled {
            errors.push(ProviderError::Cancelled);
        }

        let succeeded: Vec<String> = ids
            .iter()
            .zip(&deleted)
            .filter_map(|(id, &ok)| ok.then(|| id.clone()))
            .collect();

        {
            let mut pending = self.pending_delete.lock().await;
            for id in &succeeded {
                pending.insert(id.clone());
            }
        }

        info!(requested = ids.len(), succeeded = succeeded.len(), "Decrease complete");
        (succeeded, combine_errors(errors))
    }

    async fn update(
        &self,
        callback: &mut (dyn for<'a> FnMut(&'a str, InstanceState) + Send),
    ) -> Result<(), ProviderError> {
        let servers = self
            .client
            .list_servers(&self.config.datacenter_id, LIST_DEPTH)
            .await?;

        let mut pending = self.pending_delete.lock().await;
        // Ids that vanished from the listing are done deleting.
        pending.retain(|id| servers.iter().any(|s| s.id == *id));

        for server in &servers {
            let Some(name) = server.properties.name.as_deref() else {
                continue;
            };
            // Servers without the group prefix belong to someone else.
            if !name.starts_with(&self.config.name) {
                continue;
            }
            let Some(state) = server.metadata.as_ref().map(|m| m.state.as_str()) else {
                continue;
            };
            if let Some(mapped) = map_vm_state(state, pending.contains(&server.id)) {
                callback(&server.id, mapped);
            }
        }

        Ok(())
    }

    async fn connect_info(&self, id: &str) -> Result<ConnectInfo, ProviderError> {
        let server = self
            .client
            .get_server(&self.config.datacenter_id, id, LIST_DEPTH)
            .await?;

        let state = server
            .metadata
            .as_ref()
            .map(|m| m.state.as_str())
            .unwrap_or_default();
        if state != VM_STATE_AVAILABLE {
            return Err(ProviderError::NotReady {
                id: server.id,
                state: state.to_string(),
            });
        }

        let nics = server
            .entities
            .and_then(|e| e.nics)
            .map(|n| n.items)
            .unwrap_or_default();
        let (external, internal) = extract_addresses(&nics);

        let Some(primary) = external.clone().or_else(|| internal.clone()) else {
            return Err(ProviderError::NoAddress(server.id));
        };

        Ok(ConnectInfo {
            id: server.id,
            external_addr: external.unwrap_or_else(|| primary.clone()),
            internal_addr: internal.unwrap_or(primary),
            connector: self.settings.connector.clone(),
        })
    }

    async fn shutdown(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
