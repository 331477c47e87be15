//! Worker pool deployment planner
//!
//! Turns the pools of a Worker into one [`MachineDeployment`] and one
//! [`MachineClass`] per pool and zone. Planning is a pure function of the
//! Worker, the cluster context and the state recorded by earlier passes: no
//! I/O, no logging, and any error aborts the whole pass without output.
//!
//! Per pool the image and the identity hash are computed once; per zone the
//! counts and budgets are distributed and the payloads assembled. Output
//! follows pool declaration order, then zone order.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use semver::Version;
use serde::{Deserialize, Serialize};

use lattice_common::crd::openstack::{
    CloudProfileConfig, InfrastructureStatus, MachineImage, WorkerConfig, WorkerStatus,
    DEFAULT_ARCHITECTURE, PURPOSE_NODES, WORKER_STATUS_KIND,
};
use lattice_common::crd::{decode_raw, parse_kubernetes_version, Cluster, Worker, WorkerPool};
use lattice_common::{Error, Result};

use crate::constants::{
    class_name, cluster_tag, deployment_name, NODE_ROLE_TAG, PURPOSE_LABEL, PURPOSE_MACHINE_CLASS,
    TAG_PRESENT,
};
use crate::deployment::{MachineConfiguration, MachineDeployment};
use crate::distribute::{distribute_budget, distribute_over_zones, Budget, BudgetKind};
use crate::hash::{worker_pool_hash, PoolHashInputs};
use crate::image::{append_machine_image, resolve_machine_image, ResolvedImage};
use crate::labels::{normalize_labels_for_machine_class, zone_deployment_labels};
use crate::machine_class::{
    CredentialsSecretRef, MachineClass, MachineClassNodeTemplate, MachineClassSecret,
    MachineClassValues,
};

/// Everything a planning pass reads besides the pools themselves
///
/// Built once per pass; construction fails on the same inputs that would make
/// every pool fail.
#[derive(Clone, Debug)]
pub struct PlanningContext {
    /// Worker namespace, prefix of every deployment name
    pub namespace: String,
    /// Cloud region
    pub region: String,
    /// Cloud credentials of the worker
    pub credentials: CredentialsSecretRef,
    /// Control plane Kubernetes version
    pub kubernetes_version: Version,
    /// Pod network CIDR of the cluster
    pub pods_cidr: Option<String>,
    /// Networks and key pair created by the infrastructure controller
    pub infrastructure: InfrastructureStatus,
    /// Name of the security group for nodes
    pub nodes_security_group: String,
    /// Image catalog of the cloud profile
    pub catalog: CloudProfileConfig,
    /// Provider status recorded by the previous pass
    pub previous_status: Option<WorkerStatus>,
}

impl PlanningContext {
    /// Decode and check the context of a Worker
    pub fn from_resources(worker: &Worker, cluster: &Cluster) -> Result<Self> {
        let namespace = worker.namespace()?.to_string();
        let kubernetes_version = cluster.shoot.kubernetes_version()?;

        let infrastructure: InfrastructureStatus = decode_field(
            worker.spec.infrastructure_provider_status.as_ref(),
            "InfrastructureStatus",
            "spec.infrastructureProviderStatus",
        )?
        .ok_or_else(|| {
            Error::configuration_field(
                "spec.infrastructureProviderStatus",
                "infrastructure provider status is missing",
            )
        })?;

        let nodes_security_group = infrastructure
            .security_group(PURPOSE_NODES)
            .map(|sg| sg.name.clone())
            .ok_or_else(|| {
                Error::precondition(format!(
                    "security group for purpose {PURPOSE_NODES:?} not found in infrastructure status"
                ))
            })?;

        let catalog: CloudProfileConfig = decode_field(
            cluster.cloud_profile.provider_config.as_ref(),
            "CloudProfileConfig",
            "cloudProfile.providerConfig",
        )?
        .unwrap_or_default();

        let previous_status: Option<WorkerStatus> = decode_field(
            worker.provider_status(),
            WORKER_STATUS_KIND,
            "status.providerStatus",
        )?;

        Ok(Self {
            namespace: namespace.clone(),
            region: worker.spec.region.clone(),
            credentials: CredentialsSecretRef {
                name: worker.spec.secret_ref.name.clone().unwrap_or_default(),
                namespace: worker
                    .spec
                    .secret_ref
                    .namespace
                    .clone()
                    .unwrap_or(namespace),
            },
            kubernetes_version,
            pods_cidr: cluster.shoot.pods_cidr.clone(),
            infrastructure,
            nodes_security_group,
            catalog,
            previous_status,
        })
    }

    fn server_group_id(&self, pool_name: &str) -> Result<&str> {
        self.previous_status
            .as_ref()
            .and_then(|status| status.server_group_dependency(pool_name))
            .map(|dependency| dependency.id.as_str())
            .ok_or_else(|| {
                Error::resolution_for(
                    pool_name,
                    format!(
                        "server group is required for pool {pool_name:?}, but no server group dependency found"
                    ),
                )
            })
    }
}

fn decode_field<T: serde::de::DeserializeOwned>(
    raw: Option<&serde_json::Value>,
    kind: &str,
    field: &str,
) -> Result<Option<T>> {
    decode_raw(raw, kind).map_err(|e| Error::configuration_field(field, e.to_string()))
}

/// Deployment and machine class of one pool in one zone
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlannedZone {
    /// Pool the zone belongs to
    pub pool: String,
    /// Zone name
    pub zone: String,
    /// Deployment for the machine controller manager
    pub deployment: MachineDeployment,
    /// Machine class backing the deployment
    pub machine_class: MachineClass,
}

/// Result of a planning pass
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// One entry per pool and zone, pools in declaration order
    pub zones: Vec<PlannedZone>,
    /// Images used by the pools, without duplicates
    pub machine_images: Vec<MachineImage>,
}

impl Plan {
    /// The deployments, in plan order
    pub fn machine_deployments(&self) -> Vec<MachineDeployment> {
        self.zones.iter().map(|z| z.deployment.clone()).collect()
    }

    /// The machine classes as chart values, in plan order
    pub fn machine_class_values(&self) -> MachineClassValues {
        MachineClassValues {
            machine_classes: self.zones.iter().map(|z| z.machine_class.clone()).collect(),
        }
    }
}

/// Plan every pool of a Worker
pub fn plan(pools: &[WorkerPool], ctx: &PlanningContext) -> Result<Plan> {
    let mut plan = Plan::default();
    for (index, pool) in pools.iter().enumerate() {
        plan_pool(index, pool, ctx, &mut plan)?;
    }
    Ok(plan)
}

/// Settings shared by every zone of a pool
struct PoolSettings {
    image: ResolvedImage,
    pool_hash: String,
    server_group_id: Option<String>,
    surge: Budget,
    unavailable: Budget,
    root_disk_size: Option<u32>,
    tags: BTreeMap<String, String>,
    capacity: Option<BTreeMap<String, Quantity>>,
}

fn plan_pool(index: usize, pool: &WorkerPool, ctx: &PlanningContext, plan: &mut Plan) -> Result<()> {
    let settings = pool_settings(index, pool, ctx)?;
    let zone_count = pool.zones.len();

    for (zone_index, zone) in pool.zones.iter().enumerate() {
        let deployment_name = deployment_name(&ctx.namespace, &pool.name, zone_index);
        let class_name = class_name(&deployment_name, &settings.pool_hash);

        let deployment = MachineDeployment {
            name: deployment_name,
            class_name: class_name.clone(),
            secret_name: class_name.clone(),
            minimum: distribute_over_zones(zone_index, pool.minimum, zone_count),
            maximum: distribute_over_zones(zone_index, pool.maximum, zone_count),
            max_surge: distribute_budget(
                zone_index,
                settings.surge,
                zone_count,
                BudgetKind::Surge.reference_total(pool.minimum, pool.maximum),
                BudgetKind::Surge,
            ),
            max_unavailable: distribute_budget(
                zone_index,
                settings.unavailable,
                zone_count,
                BudgetKind::Unavailable.reference_total(pool.minimum, pool.maximum),
                BudgetKind::Unavailable,
            ),
            labels: zone_deployment_labels(&pool.labels, zone),
            machine_configuration: MachineConfiguration::from_settings(
                pool.machine_controller_manager.as_ref(),
            ),
        };

        let machine_class = machine_class(class_name, zone, pool, &settings, ctx);

        plan.zones.push(PlannedZone {
            pool: pool.name.clone(),
            zone: zone.clone(),
            deployment,
            machine_class,
        });
    }

    append_machine_image(
        &mut plan.machine_images,
        settings.image.status_entry(&pool.machine_image),
    );
    Ok(())
}

fn pool_settings(index: usize, pool: &WorkerPool, ctx: &PlanningContext) -> Result<PoolSettings> {
    pool.validate(index)?;

    let worker_config: WorkerConfig = decode_field(
        pool.provider_config.as_ref(),
        "WorkerConfig",
        &format!("spec.pools[{index}].providerConfig"),
    )?
    .unwrap_or_default();

    let architecture = pool.architecture.as_deref().unwrap_or(DEFAULT_ARCHITECTURE);
    let image = resolve_machine_image(
        &ctx.catalog,
        ctx.previous_status.as_ref(),
        &pool.machine_image,
        &ctx.region,
        architecture,
        &pool.name,
    )?;

    let server_group_id = match worker_config.server_group {
        Some(_) => Some(ctx.server_group_id(&pool.name)?.to_string()),
        None => None,
    };

    let kubernetes_version = match pool.kubernetes_version.as_deref() {
        Some(version) => parse_kubernetes_version(version).map_err(|e| {
            Error::configuration_field(format!("spec.pools[{index}].kubernetesVersion"), e.to_string())
        })?,
        None => ctx.kubernetes_version.clone(),
    };

    let surge = Budget::parse(
        &pool.max_surge,
        &format!("spec.pools[{index}].{}", BudgetKind::Surge.field_name()),
    )?;
    let unavailable = Budget::parse(
        &pool.max_unavailable,
        &format!("spec.pools[{index}].{}", BudgetKind::Unavailable.field_name()),
    )?;

    let root_disk_size = pool
        .volume
        .as_ref()
        .map(|volume| {
            volume.size_gib().map_err(|e| {
                Error::configuration_field(format!("spec.pools[{index}].volume.size"), e.to_string())
            })
        })
        .transpose()?;

    let pool_hash = worker_pool_hash(
        pool,
        &PoolHashInputs {
            kubernetes_version: &kubernetes_version,
            image: &image,
            machine_labels: &worker_config.machine_labels,
            server_group_id: server_group_id.as_deref(),
        },
    );

    let mut tags = normalize_labels_for_machine_class(&pool.labels);
    tags.insert(cluster_tag(&ctx.namespace), TAG_PRESENT.to_string());
    tags.insert(NODE_ROLE_TAG.to_string(), TAG_PRESENT.to_string());
    for label in &worker_config.machine_labels {
        tags.insert(label.name.clone(), label.value.clone());
    }

    let capacity = worker_config
        .node_template
        .map(|template| template.capacity)
        .or_else(|| pool.node_template.as_ref().map(|t| t.capacity.clone()));

    Ok(PoolSettings {
        image,
        pool_hash,
        server_group_id,
        surge,
        unavailable,
        root_disk_size,
        tags,
        capacity,
    })
}

fn machine_class(
    name: String,
    zone: &str,
    pool: &WorkerPool,
    settings: &PoolSettings,
    ctx: &PlanningContext,
) -> MachineClass {
    MachineClass {
        name,
        region: ctx.region.clone(),
        availability_zone: zone.to_string(),
        machine_type: pool.machine_type.clone(),
        key_name: ctx.infrastructure.node.key_name.clone(),
        image_id: settings.image.id().map(str::to_string),
        image_name: settings.image.name().map(str::to_string),
        network_id: ctx.infrastructure.networks.id.clone(),
        subnet_id: ctx
            .infrastructure
            .subnet(PURPOSE_NODES)
            .map(|subnet| subnet.id.clone()),
        pod_network_cidr: ctx.pods_cidr.clone(),
        security_groups: vec![ctx.nodes_security_group.clone()],
        server_group_id: settings.server_group_id.clone(),
        root_disk_size: settings.root_disk_size,
        root_disk_type: pool.volume.as_ref().and_then(|v| v.type_.clone()),
        tags: settings.tags.clone(),
        labels: BTreeMap::from([(PURPOSE_LABEL.to_string(), PURPOSE_MACHINE_CLASS.to_string())]),
        credentials_secret_ref: ctx.credentials.clone(),
        secret: MachineClassSecret {
            cloud_config: pool.user_data_string(),
        },
        node_template: settings
            .capacity
            .as_ref()
            .map(|capacity| MachineClassNodeTemplate {
                capacity: capacity.clone(),
                instance_type: pool.machine_type.clone(),
                region: ctx.region.clone(),
                zone: zone.to_string(),
            }),
    }
}
