//! Collaborators that write planning results to the cluster
//!
//! Provides trait-based abstractions so tests can mock the Kubernetes side
//! while production code uses real API calls.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::Client;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use lattice_common::crd::openstack::WorkerStatus;
use lattice_common::crd::{WORKER_API_VERSION, WORKER_KIND};
use lattice_common::kube_utils::build_api_resource;
use lattice_common::{Error, FIELD_MANAGER};

use crate::constants::{
    MACHINE_CLASS_API_VERSION, MACHINE_CLASS_KIND, MACHINE_CLASS_PROVIDER, PURPOSE_LABEL,
    PURPOSE_MACHINE_CLASS,
};
use crate::machine_class::{MachineClass, MachineClassValues};

/// Key of the user data in machine class secrets
const USER_DATA_KEY: &str = "userData";

/// Applies rendered machine class values
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MachineClassApplier: Send + Sync {
    /// Create or update every machine class (and its secret) in `namespace`
    async fn apply(&self, namespace: &str, values: &MachineClassValues) -> Result<(), Error>;
}

/// Persists the provider status of a Worker
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkerStatusWriter: Send + Sync {
    /// Replace `status.providerStatus` of the Worker `namespace/name`
    async fn patch_provider_status(
        &self,
        namespace: &str,
        name: &str,
        status: &WorkerStatus,
    ) -> Result<(), Error>;
}

/// Server-side applies machine classes as MCM `MachineClass` objects
pub struct KubeMachineClassApplier {
    client: Client,
}

impl KubeMachineClassApplier {
    /// Create a new KubeMachineClassApplier
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn apply_secret(&self, namespace: &str, class: &MachineClass) -> Result<(), Error> {
        let secret = machine_class_secret(namespace, class);
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.patch(
            &class.name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&secret),
        )
        .await?;
        debug!(name = %class.name, namespace = %namespace, "Applied machine class secret");
        Ok(())
    }

    async fn apply_class(&self, namespace: &str, class: &MachineClass) -> Result<(), Error> {
        let ar = build_api_resource(MACHINE_CLASS_API_VERSION, MACHINE_CLASS_KIND);
        let obj: DynamicObject = serde_json::from_value(machine_class_object(namespace, class)?)
            .map_err(|e| Error::serialization_for_kind(MACHINE_CLASS_KIND, e.to_string()))?;

        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);
        api.patch(
            &class.name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&obj),
        )
        .await?;

        info!(
            kind = %MACHINE_CLASS_KIND,
            name = %class.name,
            zone = %class.availability_zone,
            namespace = %namespace,
            "Applied machine class"
        );
        Ok(())
    }
}

#[async_trait]
impl MachineClassApplier for KubeMachineClassApplier {
    async fn apply(&self, namespace: &str, values: &MachineClassValues) -> Result<(), Error> {
        for class in &values.machine_classes {
            self.apply_secret(namespace, class).await?;
            self.apply_class(namespace, class).await?;
        }
        Ok(())
    }
}

/// Merge-patches the provider status on the Worker's status subresource
pub struct KubeWorkerStatusWriter {
    client: Client,
}

impl KubeWorkerStatusWriter {
    /// Create a new KubeWorkerStatusWriter
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkerStatusWriter for KubeWorkerStatusWriter {
    async fn patch_provider_status(
        &self,
        namespace: &str,
        name: &str,
        status: &WorkerStatus,
    ) -> Result<(), Error> {
        let ar = build_api_resource(WORKER_API_VERSION, WORKER_KIND);
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);

        let patch = provider_status_patch(status)?;
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        info!(
            worker = %name,
            namespace = %namespace,
            images = status.machine_images.len(),
            "Updated worker provider status"
        );
        Ok(())
    }
}

fn labels() -> BTreeMap<String, String> {
    BTreeMap::from([(PURPOSE_LABEL.to_string(), PURPOSE_MACHINE_CLASS.to_string())])
}

/// Secret holding a machine class's user data, named like the class
fn machine_class_secret(namespace: &str, class: &MachineClass) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(class.name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(BTreeMap::from([(
            USER_DATA_KEY.to_string(),
            ByteString(class.secret.cloud_config.clone().into_bytes()),
        )])),
        ..Default::default()
    }
}

/// MCM `MachineClass` object for a machine class
fn machine_class_object(namespace: &str, class: &MachineClass) -> Result<serde_json::Value, Error> {
    let mut obj = serde_json::json!({
        "apiVersion": MACHINE_CLASS_API_VERSION,
        "kind": MACHINE_CLASS_KIND,
        "metadata": {
            "name": class.name,
            "namespace": namespace,
            "labels": class.labels,
        },
        "provider": MACHINE_CLASS_PROVIDER,
        "providerSpec": class.provider_spec()?,
        "credentialsSecretRef": {
            "name": class.credentials_secret_ref.name,
            "namespace": class.credentials_secret_ref.namespace,
        },
        "secretRef": {
            "name": class.name,
            "namespace": namespace,
        },
    });

    if let Some(ref template) = class.node_template {
        obj["nodeTemplate"] = serde_json::json!({
            "capacity": template.capacity,
            "instanceType": template.instance_type,
            "region": template.region,
            "zone": template.zone,
        });
    }

    Ok(obj)
}

fn provider_status_patch(status: &WorkerStatus) -> Result<serde_json::Value, Error> {
    let provider_status = serde_json::to_value(status)
        .map_err(|e| Error::serialization_for_kind(&status.kind, e.to_string()))?;
    Ok(serde_json::json!({
        "status": {
            "providerStatus": provider_status,
        }
    }))
}
