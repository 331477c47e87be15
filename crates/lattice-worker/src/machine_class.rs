//! Machine class payloads
//!
//! One [`MachineClass`] per pool and zone, rendered by the `machineclass`
//! chart into an MCM `MachineClass` plus its user data secret. The record is
//! typed; optional fields are omitted from the wire document when unset.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};

use lattice_common::{Error, Result};

/// Machine class values for one pool and zone
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineClass {
    /// Class name: deployment name plus pool hash
    pub name: String,
    /// Cloud region
    pub region: String,
    /// Zone the machines are created in
    pub availability_zone: String,
    /// Flavor name
    pub machine_type: String,
    /// SSH key pair name
    pub key_name: String,
    /// Glance image id, when the image was resolved through a region mapping
    #[serde(default, rename = "imageID", skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    /// Glance image name, otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    /// Cluster network id
    #[serde(rename = "networkID")]
    pub network_id: String,
    /// Subnet for nodes, when the infrastructure created one
    #[serde(default, rename = "subnetID", skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    /// Pod network CIDR of the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_network_cidr: Option<String>,
    /// Security group names
    pub security_groups: Vec<String>,
    /// Server group for anti-affinity placement
    #[serde(default, rename = "serverGroupID", skip_serializing_if = "Option::is_none")]
    pub server_group_id: Option<String>,
    /// Root disk size in GiB, when a volume is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_disk_size: Option<u32>,
    /// Cinder volume type of the root disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_disk_type: Option<String>,
    /// Nova metadata of the machines
    pub tags: BTreeMap<String, String>,
    /// Labels of the rendered objects
    pub labels: BTreeMap<String, String>,
    /// Cloud credentials
    pub credentials_secret_ref: CredentialsSecretRef,
    /// Secret holding the user data
    pub secret: MachineClassSecret,
    /// Node resources for the autoscaler's scale-from-zero simulation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_template: Option<MachineClassNodeTemplate>,
}

/// Reference to the cloud credentials secret
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsSecretRef {
    /// Secret name
    pub name: String,
    /// Secret namespace
    pub namespace: String,
}

/// Content of the per-class secret
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineClassSecret {
    /// User data handed to cloud-init
    pub cloud_config: String,
}

/// Node template of a machine class
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineClassNodeTemplate {
    /// Allocatable resources of one node
    pub capacity: BTreeMap<String, Quantity>,
    /// Flavor name
    pub instance_type: String,
    /// Cloud region
    pub region: String,
    /// Zone
    pub zone: String,
}

/// Chart values: all machine classes of one planning pass, in plan order
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineClassValues {
    /// Machine classes
    pub machine_classes: Vec<MachineClass>,
}

impl MachineClassValues {
    /// Values as the JSON document handed to the chart
    pub fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| Error::serialization_for_kind("MachineClassValues", e.to_string()))
    }

    /// Whether there is nothing to deploy
    pub fn is_empty(&self) -> bool {
        self.machine_classes.is_empty()
    }
}

impl MachineClass {
    /// Settings of the MCM `providerSpec`
    ///
    /// Everything except the object identity, credentials, user data and node
    /// template, which live at the top level of the MCM object.
    pub fn provider_spec(&self) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)
            .map_err(|e| Error::serialization_for_kind("MachineClass", e.to_string()))?;
        if let Some(fields) = value.as_object_mut() {
            for key in ["name", "labels", "credentialsSecretRef", "secret", "nodeTemplate"] {
                fields.remove(key);
            }
        }
        Ok(value)
    }
}
