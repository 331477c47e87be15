//! Centralized constants for the lattice-worker crate
//!
//! All shared constants should be defined here to avoid duplication
//! between the planner, the delegate and the kube collaborators.

// =============================================================================
// Machine Controller Manager API
// =============================================================================

/// API version of MCM machine classes
pub const MACHINE_CLASS_API_VERSION: &str = "machine.sapcloud.io/v1alpha1";

/// Kind of MCM machine classes
pub const MACHINE_CLASS_KIND: &str = "MachineClass";

/// Provider name recorded on every machine class
pub const MACHINE_CLASS_PROVIDER: &str = "OpenStack";

/// Label marking objects rendered by the machine class chart
pub const PURPOSE_LABEL: &str = "gardener.cloud/purpose";

/// Value of [`PURPOSE_LABEL`] for machine classes and their secrets
pub const PURPOSE_MACHINE_CLASS: &str = "machineclass";

// =============================================================================
// Topology Labels
// =============================================================================

/// Zone label read by the Cinder CSI driver
pub const CINDER_TOPOLOGY_ZONE_LABEL: &str = "topology.cinder.csi.openstack.org/zone";

/// Zone label read by the Manila CSI driver
pub const MANILA_TOPOLOGY_ZONE_LABEL: &str = "topology.manila.csi.openstack.org/zone";

/// Every topology dimension labelled with the zone name
pub const TOPOLOGY_ZONE_LABELS: &[&str] = &[CINDER_TOPOLOGY_ZONE_LABEL, MANILA_TOPOLOGY_ZONE_LABEL];

// =============================================================================
// Machine Class Tags
// =============================================================================

/// Tag prefix marking a machine as part of a cluster; the namespace is appended
pub const CLUSTER_TAG_PREFIX: &str = "kubernetes.io-cluster-";

/// Tag marking a machine as a node
pub const NODE_ROLE_TAG: &str = "kubernetes.io-role-node";

/// Value of cluster and role tags
pub const TAG_PRESENT: &str = "1";

// =============================================================================
// Pool Identity
// =============================================================================

/// Number of hex characters of the pool hash appended to class names
pub const POOL_HASH_LENGTH: usize = 5;

/// Version of the hashed domain; bumping it rolls every pool
pub const POOL_HASH_SCHEMA_VERSION: &str = "1";

// =============================================================================
// Helper Functions
// =============================================================================

/// Name of the deployment for the zone at `zone_index` (zero-based)
pub fn deployment_name(namespace: &str, pool_name: &str, zone_index: usize) -> String {
    format!("{}-{}-z{}", namespace, pool_name, zone_index + 1)
}

/// Name of the machine class (and its secret) for a deployment
pub fn class_name(deployment_name: &str, pool_hash: &str) -> String {
    format!("{}-{}", deployment_name, pool_hash)
}

/// Cluster membership tag key for a namespace
pub fn cluster_tag(namespace: &str) -> String {
    format!("{}{}", CLUSTER_TAG_PREFIX, namespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_indices_are_one_based_in_names() {
        assert_eq!(
            deployment_name("shoot--foobar--openstack", "pool-1", 0),
            "shoot--foobar--openstack-pool-1-z1"
        );
        assert_eq!(deployment_name("ns", "pool-2", 1), "ns-pool-2-z2");
    }

    #[test]
    fn class_names_carry_the_pool_hash() {
        assert_eq!(class_name("ns-pool-1-z1", "a1b2c"), "ns-pool-1-z1-a1b2c");
    }

    #[test]
    fn cluster_tag_embeds_namespace() {
        assert_eq!(
            cluster_tag("shoot--foobar--openstack"),
            "kubernetes.io-cluster-shoot--foobar--openstack"
        );
    }
}
