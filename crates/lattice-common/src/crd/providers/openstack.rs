//! OpenStack provider API types
//!
//! The provider-specific documents embedded as raw JSON in the Worker, the
//! cloud profile and the infrastructure status:
//! - [`WorkerConfig`]: per-pool settings (server groups, machine labels)
//! - [`CloudProfileConfig`]: the image catalog
//! - [`InfrastructureStatus`]: networks and security groups created by the
//!   infrastructure controller
//! - [`WorkerStatus`]: images in use and server groups created for pools

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};

/// API version of the OpenStack provider documents
pub const OPENSTACK_API_VERSION: &str = "openstack.provider.extensions.gardener.cloud/v1alpha1";

/// Kind of the worker provider status document
pub const WORKER_STATUS_KIND: &str = "WorkerStatus";

/// Purpose of networks and security groups used by worker nodes
pub const PURPOSE_NODES: &str = "nodes";

/// Architecture assumed when a pool or image mapping does not name one
pub const DEFAULT_ARCHITECTURE: &str = "amd64";

// =============================================================================
// WorkerConfig
// =============================================================================

/// Per-pool provider configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    /// Anti-affinity placement through an OpenStack server group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_group: Option<ServerGroup>,

    /// Labels attached to the machines (Nova metadata)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_labels: Vec<MachineLabel>,

    /// Overrides the pool's node template capacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_template: Option<WorkerNodeTemplate>,
}

/// Server group request for a pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerGroup {
    /// Nova scheduling policy (e.g., "soft-anti-affinity")
    pub policy: String,
}

/// A label attached to a pool's machines
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineLabel {
    /// Label name
    pub name: String,
    /// Label value
    pub value: String,
    /// Whether changing this label replaces the pool's machines
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub trigger_rolling_on_update: bool,
}

impl MachineLabel {
    /// A label that does not participate in the pool identity
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            trigger_rolling_on_update: false,
        }
    }

    /// A label whose changes roll the pool
    pub fn rolling(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            trigger_rolling_on_update: true,
            ..Self::new(name, value)
        }
    }
}

/// Node template override carried in the worker config
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerNodeTemplate {
    /// Allocatable resources of one node
    #[serde(default)]
    pub capacity: BTreeMap<String, Quantity>,
}

// =============================================================================
// CloudProfileConfig
// =============================================================================

/// Provider section of the cloud profile
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileConfig {
    /// Keystone endpoint
    #[serde(default, rename = "keystoneURL", skip_serializing_if = "Option::is_none")]
    pub keystone_url: Option<String>,

    /// Image catalog
    #[serde(default)]
    pub machine_images: Vec<MachineImages>,
}

/// All versions of one image
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineImages {
    /// Image name
    pub name: String,
    /// Published versions
    #[serde(default)]
    pub versions: Vec<MachineImageVersion>,
}

/// One published image version
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineImageVersion {
    /// Version string
    pub version: String,
    /// Glance image name, used when no region mapping applies
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    /// Region specific image ids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<RegionIdMapping>,
}

/// Image id of a version in one region
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegionIdMapping {
    /// Region name
    pub name: String,
    /// Glance image id
    pub id: String,
    /// Architecture of this image (defaults to amd64)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
}

// =============================================================================
// InfrastructureStatus
// =============================================================================

/// Infrastructure created for the cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    /// Network and subnets
    #[serde(default)]
    pub networks: NetworkStatus,
    /// Security groups by purpose
    #[serde(default)]
    pub security_groups: Vec<SecurityGroup>,
    /// Node settings
    #[serde(default)]
    pub node: NodeStatus,
}

impl InfrastructureStatus {
    /// Security group with the given purpose
    pub fn security_group(&self, purpose: &str) -> Option<&SecurityGroup> {
        self.security_groups.iter().find(|sg| sg.purpose == purpose)
    }

    /// Subnet with the given purpose
    pub fn subnet(&self, purpose: &str) -> Option<&Subnet> {
        self.networks.subnets.iter().find(|s| s.purpose == purpose)
    }
}

/// Network of the cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    /// Network id
    #[serde(default)]
    pub id: String,
    /// Subnets by purpose
    #[serde(default)]
    pub subnets: Vec<Subnet>,
}

/// A subnet
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    /// What the subnet is for
    pub purpose: String,
    /// Subnet id
    pub id: String,
}

/// A security group
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroup {
    /// What the group is for
    pub purpose: String,
    /// Group name
    pub name: String,
    /// Group id
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

/// Node settings of the infrastructure
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    /// SSH key pair name
    #[serde(default)]
    pub key_name: String,
}

// =============================================================================
// WorkerStatus
// =============================================================================

/// Provider status of the Worker
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    /// Always [`OPENSTACK_API_VERSION`]
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Always [`WORKER_STATUS_KIND`]
    #[serde(default = "default_worker_status_kind")]
    pub kind: String,
    /// Images in use by the pools
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_images: Vec<MachineImage>,
    /// Server groups created for pools
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub server_group_dependencies: Vec<ServerGroupDependency>,
}

fn default_api_version() -> String {
    OPENSTACK_API_VERSION.to_string()
}

fn default_worker_status_kind() -> String {
    WORKER_STATUS_KIND.to_string()
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_worker_status_kind(),
            machine_images: Vec::new(),
            server_group_dependencies: Vec::new(),
        }
    }
}

impl WorkerStatus {
    /// Server group created for the given pool
    pub fn server_group_dependency(&self, pool_name: &str) -> Option<&ServerGroupDependency> {
        self.server_group_dependencies
            .iter()
            .find(|dep| dep.pool_name == pool_name)
    }
}

/// An image resolved for a pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineImage {
    /// Abstract image name
    pub name: String,
    /// Abstract image version
    pub version: String,
    /// Glance image name (set when resolved by name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Glance image id (set when resolved through a region mapping)
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Image architecture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
}

/// A server group created for a pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerGroupDependency {
    /// Pool the group belongs to
    pub pool_name: String,
    /// Server group name
    pub name: String,
    /// Server group id
    #[serde(rename = "id")]
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_config_machine_labels_default_to_non_rolling() {
        let config: WorkerConfig = serde_json::from_value(serde_json::json!({
            "serverGroup": {"policy": "soft-anti-affinity"},
            "machineLabels": [
                {"name": "foo", "value": "bar"},
                {"name": "vmspec/a", "value": "blabla", "triggerRollingOnUpdate": true}
            ]
        }))
        .expect("worker config should decode");

        assert_eq!(config.server_group.unwrap().policy, "soft-anti-affinity");
        assert_eq!(config.machine_labels[0], MachineLabel::new("foo", "bar"));
        assert_eq!(config.machine_labels[1], MachineLabel::rolling("vmspec/a", "blabla"));
    }

    #[test]
    fn cloud_profile_keystone_url_keeps_wire_name() {
        let config = CloudProfileConfig {
            keystone_url: Some("auth-url".to_string()),
            machine_images: vec![],
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["keystoneURL"], "auth-url");
    }

    #[test]
    fn infrastructure_lookups_by_purpose() {
        let status: InfrastructureStatus = serde_json::from_value(serde_json::json!({
            "networks": {"id": "network-id", "subnets": [{"purpose": "nodes", "id": "subnetID"}]},
            "securityGroups": [{"purpose": "nodes", "name": "nodes-sec-group"}],
            "node": {"keyName": "key-name"}
        }))
        .unwrap();

        assert_eq!(status.security_group(PURPOSE_NODES).unwrap().name, "nodes-sec-group");
        assert_eq!(status.subnet(PURPOSE_NODES).unwrap().id, "subnetID");
        assert!(status.security_group("router").is_none());
        assert_eq!(status.node.key_name, "key-name");
    }

    #[test]
    fn worker_status_finds_dependency_by_pool() {
        let status = WorkerStatus {
            server_group_dependencies: vec![
                ServerGroupDependency {
                    pool_name: "pool-1".to_string(),
                    name: "servergroup1".to_string(),
                    id: "id1".to_string(),
                },
                ServerGroupDependency {
                    pool_name: "pool-2".to_string(),
                    name: "servergroup2".to_string(),
                    id: "id2".to_string(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(status.server_group_dependency("pool-2").unwrap().id, "id2");
        assert!(status.server_group_dependency("pool-3").is_none());

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["kind"], "WorkerStatus");
        assert_eq!(value["apiVersion"], OPENSTACK_API_VERSION);
        assert!(value.get("machineImages").is_none());
    }
}
