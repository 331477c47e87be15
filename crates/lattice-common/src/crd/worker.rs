//! Worker resource: the desired worker pools of one cluster
//!
//! Mirrors the `extensions.gardener.cloud/v1alpha1` `Worker` resource. Only the
//! fields the planner consumes are modeled; provider-specific sections stay
//! raw JSON until the OpenStack types decode them.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::SecretReference;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::ByteString;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// API version of the Worker resource
pub const WORKER_API_VERSION: &str = "extensions.gardener.cloud/v1alpha1";

/// Kind of the Worker resource
pub const WORKER_KIND: &str = "Worker";

/// A Worker resource
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    /// Standard object metadata; the namespace is the cluster's technical id
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Desired state
    pub spec: WorkerSpec,

    /// Observed state written back by previous reconciliations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkerResourceStatus>,
}

impl Worker {
    /// Namespace of the worker, required for every derived resource name
    pub fn namespace(&self) -> Result<&str> {
        self.metadata
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .ok_or_else(|| Error::configuration_field("metadata.namespace", "worker namespace required"))
    }

    /// Name of the worker resource
    pub fn name(&self) -> Result<&str> {
        self.metadata
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::configuration_field("metadata.name", "worker name required"))
    }

    /// Raw provider status persisted by an earlier pass, if any
    pub fn provider_status(&self) -> Option<&serde_json::Value> {
        self.status.as_ref().and_then(|s| s.provider_status.as_ref())
    }
}

/// Specification of a Worker
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSpec {
    /// Cloud region the pools run in
    pub region: String,

    /// Reference to the cloud credentials secret
    #[serde(default)]
    pub secret_ref: SecretReference,

    /// Raw provider status of the infrastructure (networks, security groups)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_provider_status: Option<serde_json::Value>,

    /// Worker pools, in declaration order
    #[serde(default)]
    pub pools: Vec<WorkerPool>,
}

/// Observed state of a Worker
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResourceStatus {
    /// Raw provider status (decoded as the OpenStack `WorkerStatus`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<serde_json::Value>,
}

/// One worker pool
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPool {
    /// Pool name, unique within the worker
    pub name: String,

    /// Minimum number of nodes across all zones
    pub minimum: u32,

    /// Maximum number of nodes across all zones
    pub maximum: u32,

    /// Extra nodes allowed during a rolling update (count or percentage of maximum)
    pub max_surge: IntOrString,

    /// Nodes allowed to be missing during a rolling update (count or percentage of minimum)
    pub max_unavailable: IntOrString,

    /// Flavor name
    pub machine_type: String,

    /// Abstract image reference, resolved through the cloud profile
    pub machine_image: MachineImageRef,

    /// Availability zones; order decides who receives the remainder
    #[serde(default)]
    pub zones: Vec<String>,

    /// Labels for the pool's nodes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Cloud-init user data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<ByteString>,

    /// Node resources used by the autoscaler's scale-from-zero simulation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_template: Option<NodeTemplate>,

    /// Root volume settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Volume>,

    /// CPU architecture (defaults to amd64)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,

    /// Kubernetes version override for this pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,

    /// Raw provider config (decoded as the OpenStack `WorkerConfig`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,

    /// Rolling update settings, passed through to the machine deployments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_controller_manager: Option<MachineControllerManagerSettings>,
}

impl WorkerPool {
    /// Validate the pool shape before planning
    ///
    /// `index` is the pool's position in `spec.pools`, used in field paths.
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.minimum > self.maximum {
            return Err(Error::configuration_field(
                format!("spec.pools[{index}].minimum"),
                format!(
                    "pool {:?}: minimum ({}) must not exceed maximum ({})",
                    self.name, self.minimum, self.maximum
                ),
            ));
        }
        if self.zones.is_empty() {
            return Err(Error::configuration_field(
                format!("spec.pools[{index}].zones"),
                format!("pool {:?} must list at least one zone", self.name),
            ));
        }
        Ok(())
    }

    /// User data as a string, empty when unset
    pub fn user_data_string(&self) -> String {
        self.user_data
            .as_ref()
            .map(|data| String::from_utf8_lossy(&data.0).into_owned())
            .unwrap_or_default()
    }
}

/// Abstract machine image reference
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineImageRef {
    /// Image name (e.g., "ubuntu")
    pub name: String,
    /// Image version (e.g., "22.04.20240101")
    pub version: String,
}

/// Node capacity template
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeTemplate {
    /// Allocatable resources of one node
    #[serde(default)]
    pub capacity: BTreeMap<String, Quantity>,
}

/// Root volume settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Size as a quantity (e.g., "20Gi")
    pub size: String,
    /// Cinder volume type
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

impl Volume {
    /// Volume size in GiB
    ///
    /// Accepts plain integers and the `Gi`/`G` suffixes.
    pub fn size_gib(&self) -> Result<u32> {
        let trimmed = self.size.trim();
        let digits = trimmed
            .strip_suffix("Gi")
            .or_else(|| trimmed.strip_suffix('G'))
            .unwrap_or(trimmed);
        digits.parse::<u32>().map_err(|_| {
            Error::configuration_field(
                "volume.size",
                format!("invalid volume size {:?}, expected e.g. \"20Gi\"", self.size),
            )
        })
    }
}

/// Machine controller manager settings for rolling updates
///
/// Durations are carried as their string form ("10m0s") and never interpreted.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineControllerManagerSettings {
    /// Time allowed for draining a node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_drain_timeout: Option<String>,
    /// Time after which an unhealthy machine is replaced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_health_timeout: Option<String>,
    /// Time allowed for a machine to join
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_creation_timeout: Option<String>,
    /// Eviction retries during drain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_evict_retries: Option<i32>,
    /// Node conditions that mark a machine unhealthy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_conditions: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> WorkerPool {
        WorkerPool {
            name: "pool-1".to_string(),
            minimum: 5,
            maximum: 10,
            max_surge: IntOrString::Int(3),
            max_unavailable: IntOrString::String("25%".to_string()),
            machine_type: "large".to_string(),
            machine_image: MachineImageRef {
                name: "my-os".to_string(),
                version: "123".to_string(),
            },
            zones: vec!["eu-de-1a".to_string(), "eu-de-1b".to_string()],
            labels: BTreeMap::new(),
            user_data: Some(ByteString(b"some-user-data".to_vec())),
            node_template: None,
            volume: None,
            architecture: None,
            kubernetes_version: None,
            provider_config: None,
            machine_controller_manager: None,
        }
    }

    #[test]
    fn decodes_worker_from_json() {
        let worker: Worker = serde_json::from_value(serde_json::json!({
            "metadata": {"name": "worker", "namespace": "shoot--foobar--openstack"},
            "spec": {
                "region": "eu-de-1",
                "secretRef": {"name": "secret", "namespace": "shoot--foobar--openstack"},
                "pools": [{
                    "name": "pool-1",
                    "minimum": 1,
                    "maximum": 3,
                    "maxSurge": "50%",
                    "maxUnavailable": 0,
                    "machineType": "large",
                    "machineImage": {"name": "my-os", "version": "123"},
                    "zones": ["eu-de-1a"],
                    "userData": "c29tZS11c2VyLWRhdGE=",
                    "nodeTemplate": {"capacity": {"cpu": "8", "memory": "128Gi"}}
                }]
            }
        }))
        .expect("worker should decode");

        assert_eq!(worker.namespace().unwrap(), "shoot--foobar--openstack");
        assert_eq!(worker.name().unwrap(), "worker");
        let pool = &worker.spec.pools[0];
        assert_eq!(pool.max_surge, IntOrString::String("50%".to_string()));
        assert_eq!(pool.max_unavailable, IntOrString::Int(0));
        assert_eq!(pool.user_data_string(), "some-user-data");
        assert_eq!(
            pool.node_template.as_ref().unwrap().capacity["memory"],
            Quantity("128Gi".to_string())
        );
        assert!(worker.provider_status().is_none());
    }

    #[test]
    fn missing_namespace_is_a_configuration_error() {
        let worker = Worker {
            metadata: ObjectMeta::default(),
            spec: WorkerSpec::default(),
            status: None,
        };
        let err = worker.namespace().unwrap_err();
        assert_eq!(err.field(), Some("metadata.namespace"));
    }

    #[test]
    fn validates_pool_bounds_and_zones() {
        assert!(pool().validate(0).is_ok());

        let mut inverted = pool();
        inverted.minimum = 11;
        let err = inverted.validate(2).unwrap_err();
        assert_eq!(err.field(), Some("spec.pools[2].minimum"));

        let mut zoneless = pool();
        zoneless.zones.clear();
        let err = zoneless.validate(0).unwrap_err();
        assert!(err.to_string().contains("at least one zone"));
    }

    #[test]
    fn parses_volume_sizes() {
        let volume = |size: &str| Volume {
            size: size.to_string(),
            type_: None,
        };
        assert_eq!(volume("20Gi").size_gib().unwrap(), 20);
        assert_eq!(volume("50G").size_gib().unwrap(), 50);
        assert_eq!(volume("100").size_gib().unwrap(), 100);
        assert!(volume("1Ti").size_gib().is_err());
    }
}
