//! Worker delegate: runs the planner for one Worker and hands the results to
//! the collaborators that persist them.

use tracing::{debug, info, warn};

use lattice_common::crd::openstack::{WorkerStatus, WORKER_STATUS_KIND};
use lattice_common::crd::{decode_raw, Cluster, Worker};
use lattice_common::Result;

use crate::client::{MachineClassApplier, WorkerStatusWriter};
use crate::deployment::MachineDeployment;
use crate::machine_class::MachineClassValues;
use crate::planner::{plan, Plan, PlanningContext};

/// Planning and persistence for one Worker
#[derive(Clone, Debug)]
pub struct WorkerDelegate {
    worker: Worker,
    cluster: Cluster,
}

impl WorkerDelegate {
    /// Create a delegate for one pass over `worker`
    pub fn new(worker: Worker, cluster: Cluster) -> Self {
        Self { worker, cluster }
    }

    /// The Worker being planned
    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    /// Run the planner
    pub fn plan(&self) -> Result<Plan> {
        let ctx = PlanningContext::from_resources(&self.worker, &self.cluster)?;
        plan(&self.worker.spec.pools, &ctx)
    }

    /// Deployments for every pool and zone
    pub fn generate_machine_deployments(&self) -> Result<Vec<MachineDeployment>> {
        Ok(self.plan()?.machine_deployments())
    }

    /// Machine class chart values for every pool and zone
    pub fn machine_class_values(&self) -> Result<MachineClassValues> {
        Ok(self.plan()?.machine_class_values())
    }

    /// Plan and apply the machine classes
    ///
    /// Nothing is applied when planning fails.
    pub async fn deploy_machine_classes(&self, applier: &dyn MachineClassApplier) -> Result<()> {
        let values = self.machine_class_values().inspect_err(|e| {
            warn!(error = %e, pool = e.pool().unwrap_or("-"), "Planning machine classes failed");
        })?;
        let namespace = self.worker.namespace()?;

        debug!(
            namespace = %namespace,
            classes = values.machine_classes.len(),
            "Deploying machine classes"
        );
        applier.apply(namespace, &values).await?;

        info!(
            namespace = %namespace,
            classes = values.machine_classes.len(),
            "Machine classes deployed"
        );
        Ok(())
    }

    /// Provider status listing the images in use
    ///
    /// Server group dependencies recorded by earlier passes are kept.
    pub fn machine_images_status(&self) -> Result<WorkerStatus> {
        let plan = self.plan()?;
        let mut status: WorkerStatus =
            decode_raw(self.worker.provider_status(), WORKER_STATUS_KIND)?.unwrap_or_default();
        status.machine_images = plan.machine_images;
        Ok(status)
    }

    /// Write the images in use to the Worker's provider status
    pub async fn update_machine_images_status(&self, writer: &dyn WorkerStatusWriter) -> Result<()> {
        let status = self.machine_images_status()?;
        let namespace = self.worker.namespace()?;
        let name = self.worker.name()?;

        writer.patch_provider_status(namespace, name, &status).await?;
        debug!(
            worker = %name,
            images = status.machine_images.len(),
            "Machine images status updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::SecretReference;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use lattice_common::crd::{
        CloudProfile, MachineImageRef, Shoot, WorkerPool, WorkerResourceStatus, WorkerSpec,
    };
    use lattice_common::Error;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    use crate::client::{MockMachineClassApplier, MockWorkerStatusWriter};

    const NAMESPACE: &str = "shoot--foobar--openstack";

    fn pool(provider_config: Option<serde_json::Value>) -> WorkerPool {
        WorkerPool {
            name: "pool-1".to_string(),
            minimum: 5,
            maximum: 10,
            max_surge: IntOrString::Int(3),
            max_unavailable: IntOrString::Int(2),
            machine_type: "large".to_string(),
            machine_image: MachineImageRef {
                name: "my-os".to_string(),
                version: "123".to_string(),
            },
            zones: vec!["eu-de-1a".to_string(), "eu-de-1b".to_string()],
            labels: BTreeMap::new(),
            user_data: None,
            node_template: None,
            volume: None,
            architecture: None,
            kubernetes_version: None,
            provider_config,
            machine_controller_manager: None,
        }
    }

    fn worker(pool: WorkerPool, provider_status: Option<serde_json::Value>) -> Worker {
        Worker {
            metadata: ObjectMeta {
                name: Some("worker".to_string()),
                namespace: Some(NAMESPACE.to_string()),
                ..Default::default()
            },
            spec: WorkerSpec {
                region: "eu-de-1".to_string(),
                secret_ref: SecretReference {
                    name: Some("secret".to_string()),
                    namespace: Some(NAMESPACE.to_string()),
                },
                infrastructure_provider_status: Some(json!({
                    "networks": {"id": "network-id"},
                    "securityGroups": [{"purpose": "nodes", "name": "nodes-sec-group"}],
                    "node": {"keyName": "key-name"}
                })),
                pools: vec![pool],
            },
            status: provider_status.map(|provider_status| WorkerResourceStatus {
                provider_status: Some(provider_status),
            }),
        }
    }

    fn cluster() -> Cluster {
        Cluster {
            cloud_profile: CloudProfile {
                name: "openstack".to_string(),
                provider_config: Some(json!({
                    "machineImages": [{
                        "name": "my-os",
                        "versions": [{
                            "version": "123",
                            "regions": [{"name": "eu-de-1", "id": "image-id"}]
                        }]
                    }]
                })),
            },
            shoot: Shoot {
                kubernetes_version: "1.24.3".to_string(),
                pods_cidr: None,
            },
        }
    }

    /// Captured collaborator calls, checked after the delegate returns
    #[derive(Clone, Default)]
    struct Capture<T> {
        calls: Arc<Mutex<Vec<(String, T)>>>,
    }

    impl<T: Clone> Capture<T> {
        fn record(&self, namespace: &str, value: T) {
            self.calls.lock().unwrap().push((namespace.to_string(), value));
        }

        fn calls(&self) -> Vec<(String, T)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn deploys_all_classes_in_one_apply() {
        let delegate = WorkerDelegate::new(worker(pool(None), None), cluster());

        let capture = Capture::<MachineClassValues>::default();
        let recorder = capture.clone();
        let mut applier = MockMachineClassApplier::new();
        applier.expect_apply().returning(move |namespace, values| {
            recorder.record(namespace, values.clone());
            Ok(())
        });

        delegate.deploy_machine_classes(&applier).await.unwrap();

        let calls = capture.calls();
        assert_eq!(calls.len(), 1);
        let (namespace, values) = &calls[0];
        assert_eq!(namespace, NAMESPACE);
        assert_eq!(values.machine_classes.len(), 2);
        assert_eq!(values.machine_classes[0].image_id.as_deref(), Some("image-id"));
    }

    /// Story: the pool wants a server group that does not exist yet
    ///
    /// The operator gets the exact message and nothing reaches the cluster.
    #[tokio::test]
    async fn story_missing_server_group_applies_nothing() {
        let config = json!({"serverGroup": {"policy": "soft-anti-affinity"}});
        let delegate = WorkerDelegate::new(worker(pool(Some(config)), None), cluster());

        let mut applier = MockMachineClassApplier::new();
        applier.expect_apply().never();

        let err = delegate.deploy_machine_classes(&applier).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"server group is required for pool "pool-1", but no server group dependency found"#
        );
        assert_eq!(err.pool(), Some("pool-1"));
    }

    #[tokio::test]
    async fn apply_errors_are_propagated() {
        let delegate = WorkerDelegate::new(worker(pool(None), None), cluster());

        let mut applier = MockMachineClassApplier::new();
        applier
            .expect_apply()
            .returning(|_, _| Err(Error::precondition("machine class CRD not installed")));

        let err = delegate.deploy_machine_classes(&applier).await.unwrap_err();
        assert!(err.to_string().contains("machine class CRD not installed"));
    }

    #[tokio::test]
    async fn status_keeps_server_group_dependencies() {
        let config = json!({"serverGroup": {"policy": "soft-anti-affinity"}});
        let previous = json!({
            "apiVersion": "openstack.provider.extensions.gardener.cloud/v1alpha1",
            "kind": "WorkerStatus",
            "serverGroupDependencies": [{"poolName": "pool-1", "name": "servergroup1", "id": "id1"}]
        });
        let delegate = WorkerDelegate::new(worker(pool(Some(config)), Some(previous)), cluster());

        let capture = Capture::<(String, WorkerStatus)>::default();
        let recorder = capture.clone();
        let mut writer = MockWorkerStatusWriter::new();
        writer
            .expect_patch_provider_status()
            .returning(move |namespace, name, status| {
                recorder.record(namespace, (name.to_string(), status.clone()));
                Ok(())
            });

        delegate.update_machine_images_status(&writer).await.unwrap();

        let calls = capture.calls();
        assert_eq!(calls.len(), 1);
        let (namespace, (name, status)) = &calls[0];
        assert_eq!(namespace, NAMESPACE);
        assert_eq!(name, "worker");
        assert_eq!(status.server_group_dependencies.len(), 1);
        assert_eq!(status.machine_images.len(), 1);
        assert_eq!(status.machine_images[0].id.as_deref(), Some("image-id"));
    }

    #[test]
    fn deployments_reference_their_classes() {
        let delegate = WorkerDelegate::new(worker(pool(None), None), cluster());
        let deployments = delegate.generate_machine_deployments().unwrap();
        let values = delegate.machine_class_values().unwrap();

        for (deployment, class) in deployments.iter().zip(&values.machine_classes) {
            assert_eq!(deployment.class_name, class.name);
        }
        assert_eq!(delegate.worker().name().unwrap(), "worker");
    }
}
