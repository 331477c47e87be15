//! Cluster context handed to the worker planner
//!
//! A trimmed view of the shoot cluster and its cloud profile: just enough to
//! resolve images, pick the Kubernetes version and fill in pod networking.

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Cluster context for one planning pass
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Cloud profile the cluster was created from
    pub cloud_profile: CloudProfile,
    /// The cluster itself
    pub shoot: Shoot,
}

/// Cloud profile reference with its provider config
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfile {
    /// Cloud profile name
    pub name: String,
    /// Raw provider config (decoded as the OpenStack `CloudProfileConfig`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,
}

/// The subset of the shoot spec relevant to workers
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Shoot {
    /// Control plane Kubernetes version (e.g., "1.24.3")
    pub kubernetes_version: String,
    /// Pod network CIDR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods_cidr: Option<String>,
}

impl Shoot {
    /// Parsed control plane version
    pub fn kubernetes_version(&self) -> Result<Version> {
        parse_kubernetes_version(&self.kubernetes_version)
    }
}

/// Parse a Kubernetes version such as "1.24.3" or "v1.24.3"
pub fn parse_kubernetes_version(version: &str) -> Result<Version> {
    Version::parse(version.trim().trim_start_matches('v')).map_err(|e| {
        Error::configuration_field(
            "kubernetesVersion",
            format!("invalid kubernetes version {version:?}: {e}"),
        )
    })
}
