//! Pool identity hash
//!
//! The hash is appended to machine class names. MCM replaces the machines of
//! a deployment whenever its class name changes, so the hashed domain holds
//! exactly the settings that cannot be applied to running machines:
//!
//! - machine type, image and resolved image reference
//! - Kubernetes `major.minor`
//! - root volume size and type, architecture
//! - machine labels marked `triggerRollingOnUpdate`, sorted by name
//! - the server group id, when the pool has one
//!
//! Every field is length-prefixed, so moving bytes between adjacent fields
//! never produces the same digest.

use lattice_common::crd::openstack::{MachineLabel, DEFAULT_ARCHITECTURE};
use lattice_common::crd::WorkerPool;
use lattice_common::kube_utils::sha256_hex_prefix;
use semver::Version;

use crate::constants::{POOL_HASH_LENGTH, POOL_HASH_SCHEMA_VERSION};
use crate::image::{ImageReference, ResolvedImage};
use crate::labels::rolling_machine_labels;

/// Identity inputs resolved outside the pool spec
#[derive(Clone, Copy, Debug)]
pub struct PoolHashInputs<'a> {
    /// Effective Kubernetes version (pool override or cluster)
    pub kubernetes_version: &'a Version,
    /// Resolved image
    pub image: &'a ResolvedImage,
    /// Machine labels from the pool's worker config
    pub machine_labels: &'a [MachineLabel],
    /// Server group id, when the pool requested one
    pub server_group_id: Option<&'a str>,
}

/// Short hex hash identifying the machine-replacing configuration of a pool
pub fn worker_pool_hash(pool: &WorkerPool, inputs: &PoolHashInputs<'_>) -> String {
    let mut domain = HashDomain::default();

    domain.field(POOL_HASH_SCHEMA_VERSION);
    domain.field(&pool.machine_type);
    domain.field(&pool.machine_image.name);
    domain.field(&pool.machine_image.version);
    match &inputs.image.reference {
        ImageReference::Id(id) => {
            domain.field("id");
            domain.field(id);
        }
        ImageReference::Name(name) => {
            domain.field("name");
            domain.field(name);
        }
    }
    domain.field(&format!(
        "{}.{}",
        inputs.kubernetes_version.major, inputs.kubernetes_version.minor
    ));
    domain.optional(pool.volume.as_ref().map(|v| v.size.as_str()));
    domain.optional(pool.volume.as_ref().and_then(|v| v.type_.as_deref()));
    domain.field(pool.architecture.as_deref().unwrap_or(DEFAULT_ARCHITECTURE));

    let rolling = rolling_machine_labels(inputs.machine_labels);
    domain.field(&rolling.len().to_string());
    for (name, value) in rolling {
        domain.field(name);
        domain.field(value);
    }

    domain.optional(inputs.server_group_id);

    sha256_hex_prefix(&domain.bytes, POOL_HASH_LENGTH)
}

/// Canonical byte encoding of the hashed fields
#[derive(Default)]
struct HashDomain {
    bytes: Vec<u8>,
}

impl HashDomain {
    fn field(&mut self, value: &str) {
        self.bytes
            .extend_from_slice(&(value.len() as u64).to_be_bytes());
        self.bytes.extend_from_slice(value.as_bytes());
    }

    fn optional(&mut self, value: Option<&str>) {
        match value {
            Some(value) => {
                self.bytes.push(1);
                self.field(value);
            }
            None => self.bytes.push(0),
        }
    }
}
