//! Resource definitions consumed by the Lattice worker planner
//!
//! The Worker and cluster context are generic; provider documents embedded in
//! them as raw JSON are decoded with [`decode_raw`] into the types under
//! [`providers`].

mod cluster;
pub mod providers;
mod worker;

use serde::de::DeserializeOwned;

pub use cluster::{parse_kubernetes_version, CloudProfile, Cluster, Shoot};
pub use providers::openstack;
pub use worker::{
    MachineControllerManagerSettings, MachineImageRef, NodeTemplate, Volume, Worker,
    WorkerPool, WorkerResourceStatus, WorkerSpec, WORKER_API_VERSION, WORKER_KIND,
};

use crate::{Error, Result};

/// Decode an optional raw provider document into `T`
///
/// `None` and JSON `null` decode to `Ok(None)`; anything that does not match
/// the schema is a serialization error tagged with `kind`.
pub fn decode_raw<T: DeserializeOwned>(
    raw: Option<&serde_json::Value>,
    kind: &str,
) -> Result<Option<T>> {
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| Error::serialization_for_kind(kind, format!("could not decode {kind}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openstack::{InfrastructureStatus, WorkerConfig};

    #[test]
    fn absent_documents_decode_to_none() {
        let decoded: Option<WorkerConfig> = decode_raw(None, "WorkerConfig").unwrap();
        assert!(decoded.is_none());

        let null = serde_json::Value::Null;
        let decoded: Option<WorkerConfig> = decode_raw(Some(&null), "WorkerConfig").unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn malformed_documents_name_their_kind() {
        let raw = serde_json::json!({"securityGroups": "not-a-list"});
        let err = decode_raw::<InfrastructureStatus>(Some(&raw), "InfrastructureStatus")
            .unwrap_err();
        assert!(err.to_string().contains("InfrastructureStatus"));
        assert!(!err.is_retryable());
    }
}
