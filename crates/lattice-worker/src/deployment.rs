//! Zone deployments handed to the machine controller manager

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lattice_common::crd::MachineControllerManagerSettings;

/// Desired state of the machines of one pool in one zone
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineDeployment {
    /// `<namespace>-<pool>-z<zone index + 1>`
    pub name: String,
    /// Machine class backing this deployment
    pub class_name: String,
    /// Secret holding the user data; named like the class
    pub secret_name: String,
    /// Zone-local minimum
    pub minimum: u32,
    /// Zone-local maximum
    pub maximum: u32,
    /// Zone-local surge budget
    pub max_surge: u32,
    /// Zone-local unavailable budget
    pub max_unavailable: u32,
    /// Node labels (pool labels plus topology labels)
    pub labels: BTreeMap<String, String>,
    /// Rolling update settings
    pub machine_configuration: MachineConfiguration,
}

/// Rolling update settings of a deployment, copied from the pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineConfiguration {
    /// Drain timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_drain_timeout: Option<String>,
    /// Health timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_health_timeout: Option<String>,
    /// Creation timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_creation_timeout: Option<String>,
    /// Eviction retries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_evict_retries: Option<i32>,
    /// Comma separated node conditions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_conditions: Option<String>,
}

impl MachineConfiguration {
    /// Configuration for a pool's settings; unset settings stay unset
    pub fn from_settings(settings: Option<&MachineControllerManagerSettings>) -> Self {
        let Some(settings) = settings else {
            return Self::default();
        };
        Self {
            machine_drain_timeout: settings.machine_drain_timeout.clone(),
            machine_health_timeout: settings.machine_health_timeout.clone(),
            machine_creation_timeout: settings.machine_creation_timeout.clone(),
            max_evict_retries: settings.max_evict_retries,
            node_conditions: settings
                .node_conditions
                .as_ref()
                .map(|conditions| conditions.join(",")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_settings_and_joins_conditions() {
        let settings = MachineControllerManagerSettings {
            machine_drain_timeout: Some("10m0s".to_string()),
            machine_health_timeout: Some("20m0s".to_string()),
            machine_creation_timeout: Some("30m0s".to_string()),
            max_evict_retries: Some(30),
            node_conditions: Some(vec!["ReadonlyFilesystem".to_string(), "KernelDeadlock".to_string()]),
        };

        let config = MachineConfiguration::from_settings(Some(&settings));
        assert_eq!(config.machine_drain_timeout.as_deref(), Some("10m0s"));
        assert_eq!(config.machine_health_timeout.as_deref(), Some("20m0s"));
        assert_eq!(config.machine_creation_timeout.as_deref(), Some("30m0s"));
        assert_eq!(config.max_evict_retries, Some(30));
        assert_eq!(
            config.node_conditions.as_deref(),
            Some("ReadonlyFilesystem,KernelDeadlock")
        );
    }

    #[test]
    fn missing_settings_give_an_empty_configuration() {
        let config = MachineConfiguration::from_settings(None);
        assert_eq!(config, MachineConfiguration::default());

        let value = serde_json::to_value(MachineDeployment {
            machine_configuration: config,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(value["machineConfiguration"], serde_json::json!({}));
    }
}
