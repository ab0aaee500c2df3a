//! IONOS Cloud API request and response models.
//!
//! Field names follow the Cloud API v6 JSON (camelCase). Only the fields this
//! provider reads or writes are modeled; everything else is ignored on
//! deserialization.

use serde::{Deserialize, Serialize};

/// Generic collection wrapper used by every list endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ItemList<T> {
    /// Collection items.
    #[serde(default)]
    pub items: Vec<T>,
}

// ============================================================================
// Server resources (responses)
// ============================================================================

/// Server resource as returned by the API.
#[derive(Debug, Deserialize)]
pub struct Server {
    /// Server UUID.
    pub id: String,
    /// Resource metadata, carrying the VM state.
    pub metadata: Option<ResourceMetadata>,
    /// Server properties.
    pub properties: ServerProperties,
    /// Attached sub-resources; present at depth >= 2.
    pub entities: Option<ServerEntities>,
}

/// Resource metadata shared by all API resources.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    /// Provider resource state (AVAILABLE, BUSY, INACTIVE).
    pub state: String,
}

/// Server properties.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProperties {
    /// Server name.
    pub name: Option<String>,
    /// Server type (ENTERPRISE or CUBE).
    #[serde(rename = "type")]
    pub server_type: Option<String>,
    /// CPU cores.
    pub cores: Option<u32>,
    /// RAM in MB.
    pub ram: Option<u32>,
    /// Template UUID for CUBE servers.
    pub template_uuid: Option<String>,
}

/// Attached sub-resources of a server.
#[derive(Debug, Deserialize)]
pub struct ServerEntities {
    /// Attached network interfaces.
    pub nics: Option<ItemList<Nic>>,
    /// Attached volumes.
    pub volumes: Option<ItemList<Volume>>,
}

/// Network interface resource.
#[derive(Debug, Deserialize)]
pub struct Nic {
    /// NIC UUID.
    pub id: Option<String>,
    /// NIC properties.
    pub properties: NicProperties,
}

/// Network interface properties.
#[derive(Debug, Deserialize)]
pub struct NicProperties {
    /// NIC name. Used to tell the public and the private attachment apart.
    pub name: Option<String>,
    /// IP addresses assigned to this NIC.
    #[serde(default)]
    pub ips: Vec<String>,
    /// LAN the NIC is attached to.
    pub lan: Option<u32>,
}

/// Volume resource.
#[derive(Debug, Deserialize)]
pub struct Volume {
    /// Volume UUID.
    pub id: Option<String>,
    /// Volume properties.
    pub properties: VolumeProperties,
}

/// Volume properties.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeProperties {
    /// Volume name.
    pub name: Option<String>,
    /// Storage backend class.
    #[serde(rename = "type")]
    pub volume_type: Option<String>,
    /// Size in GB.
    pub size: Option<u32>,
}

// ============================================================================
// Server creation (request)
// ============================================================================

/// Request body for creating a server.
#[derive(Debug, Serialize)]
pub struct CreateServer {
    /// Server properties.
    pub properties: CreateServerProperties,
    /// Sub-resources created together with the server.
    pub entities: CreateServerEntities,
}

/// Properties for a new server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServerProperties {
    /// Server name.
    pub name: String,
    /// Server type (ENTERPRISE or CUBE).
    #[serde(rename = "type")]
    pub server_type: String,
    /// Template UUID; CUBE only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_uuid: Option<String>,
    /// CPU cores; ENTERPRISE only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
    /// RAM in MB; ENTERPRISE only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram: Option<u32>,
}

/// Sub-resources for a new server.
#[derive(Debug, Serialize)]
pub struct CreateServerEntities {
    /// Boot volume.
    pub volumes: CreateItems<CreateVolume>,
    /// Network interfaces.
    pub nics: CreateItems<CreateNic>,
}

/// Collection wrapper for creation requests.
#[derive(Debug, Serialize)]
pub struct CreateItems<T> {
    /// Collection items.
    pub items: Vec<T>,
}

/// New volume attached at server creation.
#[derive(Debug, Serialize)]
pub struct CreateVolume {
    /// Volume properties.
    pub properties: CreateVolumeProperties,
}

/// Properties for a new volume.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVolumeProperties {
    /// Storage backend class.
    #[serde(rename = "type")]
    pub volume_type: String,
    /// Size in GB; ENTERPRISE only (CUBE sizes come from the template).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// OS image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Base64-encoded cloud-init payload.
    pub user_data: String,
    /// Public keys injected at boot. The API offers no other way to put a
    /// key onto a server created from a private image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_keys: Option<Vec<String>>,
}

/// New NIC attached at server creation.
#[derive(Debug, Serialize)]
pub struct CreateNic {
    /// NIC properties.
    pub properties: CreateNicProperties,
}

/// Properties for a new NIC.
#[derive(Debug, Serialize)]
pub struct CreateNicProperties {
    /// NIC name; read back when resolving connection info.
    pub name: String,
    /// LAN to attach to.
    pub lan: u32,
}

// ============================================================================
// Templates
// ============================================================================

/// CUBE template resource.
#[derive(Debug, Deserialize)]
pub struct Template {
    /// Template UUID.
    pub id: String,
    /// Template properties.
    pub properties: TemplateProperties,
}

/// CUBE template properties.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateProperties {
    /// Template name (e.g. "CUBES S").
    pub name: Option<String>,
    /// CPU cores.
    pub cores: Option<u32>,
    /// RAM in MB.
    pub ram: Option<u32>,
    /// Storage size in GB.
    pub storage_size: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_deserialization() {
        let json = r#"{
            "id": "3b1f0a55-9c0b-4c2e-8c8d-2f6f11112222",
            "type": "server",
            "metadata": { "state": "AVAILABLE", "createdDate": "2024-06-01T10:00:00Z" },
            "properties": {
                "name": "gitlab-runner-cluster-1",
                "type": "CUBE",
                "cores": 1,
                "ram": 2048,
                "templateUuid": "7a111111-1111-4111-8111-111111111111"
            },
            "entities": {
                "nics": {
                    "items": [
                        {
                            "id": "n-1",
                            "properties": { "name": "publicNIC", "ips": ["203.0.113.10"], "lan": 1 }
                        }
                    ]
                }
            }
        }"#;

        let server: Server = serde_json::from_str(json).unwrap();
        assert_eq!(server.metadata.unwrap().state, "AVAILABLE");
        assert_eq!(
            server.properties.name.as_deref(),
            Some("gitlab-runner-cluster-1")
        );
        let nics = server.entities.unwrap().nics.unwrap().items;
        assert_eq!(nics[0].properties.ips, vec!["203.0.113.10"]);
    }

    #[test]
    fn test_create_server_serialization_skips_unset_fields() {
        let req = CreateServer {
            properties: CreateServerProperties {
                name: "gitlab-runner-cluster-3".to_string(),
                server_type: "CUBE".to_string(),
                template_uuid: Some("7a111111-1111-4111-8111-111111111111".to_string()),
                cores: None,
                ram: None,
            },
            entities: CreateServerEntities {
                volumes: CreateItems {
                    items: vec![CreateVolume {
                        properties: CreateVolumeProperties {
                            volume_type: "DAS".to_string(),
                            size: None,
                            image: None,
                            user_data: "IyEvYmluL3No".to_string(),
                            ssh_keys: None,
                        },
                    }],
                },
                nics: CreateItems {
                    items: vec![CreateNic {
                        properties: CreateNicProperties {
                            name: "publicNIC".to_string(),
                            lan: 1,
                        },
                    }],
                },
            },
        };

        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"templateUuid\""));
        assert!(json.contains("\"userData\""));
        assert!(!json.contains("\"cores\""));
        assert!(!json.contains("\"size\""));
        assert!(!json.contains("\"sshKeys\""));
    }

    #[test]
    fn test_template_list_deserialization() {
        let json = r#"{
            "items": [
                {
                    "id": "7a111111-1111-4111-8111-111111111111",
                    "properties": { "name": "CUBES S", "cores": 1, "ram": 2048, "storageSize": 50 }
                }
            ]
        }"#;
        let list: ItemList<Template> = serde_json::from_str(json).unwrap();
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].properties.name.as_deref(), Some("CUBES S"));
        assert_eq!(list.items[0].properties.storage_size, Some(50));
    }
}
