//! Label handling for machine classes and zone deployments

use std::collections::BTreeMap;

use lattice_common::crd::openstack::MachineLabel;

use crate::constants::TOPOLOGY_ZONE_LABELS;

/// Rewrite label keys so they are valid machine class tag keys
///
/// Every character outside `[A-Za-z0-9._-]` becomes `-`; values are kept.
/// When two keys normalize to the same key, the one that sorts last among the
/// original keys wins.
pub fn normalize_labels_for_machine_class(
    labels: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    labels
        .iter()
        .map(|(key, value)| (normalize_key(key), value.clone()))
        .collect()
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Triggering machine labels as `(name, value)` pairs sorted by name, then value
///
/// Labels without `triggerRollingOnUpdate` are dropped.
pub fn rolling_machine_labels(labels: &[MachineLabel]) -> Vec<(&str, &str)> {
    let mut pairs: Vec<(&str, &str)> = labels
        .iter()
        .filter(|label| label.trigger_rolling_on_update)
        .map(|label| (label.name.as_str(), label.value.as_str()))
        .collect();
    pairs.sort_unstable();
    pairs
}

/// Topology labels for a zone, one per topology dimension
pub fn topology_labels(zone: &str) -> BTreeMap<String, String> {
    TOPOLOGY_ZONE_LABELS
        .iter()
        .map(|key| ((*key).to_string(), zone.to_string()))
        .collect()
}

/// Node labels of a zone deployment: pool labels plus topology labels
///
/// Topology labels win over pool labels with the same key.
pub fn zone_deployment_labels(
    pool_labels: &BTreeMap<String, String>,
    zone: &str,
) -> BTreeMap<String, String> {
    let mut labels = pool_labels.clone();
    labels.extend(topology_labels(zone));
    labels
}
