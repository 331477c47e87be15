//! Worker pool planning for OpenStack clusters
//!
//! This crate provides:
//! - Zone distribution of pool sizes and rolling-update budgets
//! - The pool identity hash that decides when machines are replaced
//! - Image resolution against the cloud profile catalog
//! - The planner producing machine deployments and machine classes per zone
//! - [`WorkerDelegate`] and the collaborator traits that persist the results
//! - The `lattice-worker` CLI

pub mod cli;
pub mod client;
pub mod constants;
pub mod delegate;
pub mod deployment;
pub mod distribute;
pub mod hash;
pub mod image;
pub mod labels;
pub mod machine_class;
pub mod planner;

// Re-export client types
pub use client::{
    KubeMachineClassApplier, KubeWorkerStatusWriter, MachineClassApplier, WorkerStatusWriter,
};

#[cfg(test)]
pub use client::{MockMachineClassApplier, MockWorkerStatusWriter};

// Re-export planning types
pub use delegate::WorkerDelegate;
pub use deployment::{MachineConfiguration, MachineDeployment};
pub use distribute::{distribute_budget, distribute_over_zones, Budget, BudgetKind};
pub use hash::{worker_pool_hash, PoolHashInputs};
pub use image::{ImageReference, ResolvedImage};
pub use labels::normalize_labels_for_machine_class;
pub use machine_class::{MachineClass, MachineClassValues};
pub use planner::{plan, Plan, PlannedZone, PlanningContext};
