//! `lattice-worker` command line
//!
//! Reads a Worker and its cluster context from files, then prints the plan,
//! prints the image status, or applies both to the current kube context.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use kube::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use lattice_common::crd::{Cluster, Worker};
use lattice_common::telemetry::LogFormat;

use crate::client::{KubeMachineClassApplier, KubeWorkerStatusWriter};
use crate::delegate::WorkerDelegate;

/// Lattice worker planner - machine deployments for OpenStack worker pools
#[derive(Parser, Debug)]
#[command(name = "lattice-worker")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log line format (json or text)
    #[arg(long, env = "LATTICE_LOG_FORMAT", default_value = "json", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Input documents of a planning pass
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Worker resource (YAML or JSON)
    #[arg(long, env = "LATTICE_WORKER_FILE")]
    pub worker: PathBuf,

    /// Cluster context with shoot and cloud profile (YAML or JSON)
    #[arg(long, env = "LATTICE_CLUSTER_FILE")]
    pub cluster: PathBuf,
}

impl InputArgs {
    /// Load both documents into a delegate
    pub fn load(&self) -> Result<WorkerDelegate> {
        let worker: Worker = load_document(&self.worker)?;
        let cluster: Cluster = load_document(&self.cluster)?;
        Ok(WorkerDelegate::new(worker, cluster))
    }
}

/// Output encoding for printed documents
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML
    #[default]
    Yaml,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print machine deployments and machine classes per pool and zone
    Plan {
        #[command(flatten)]
        input: InputArgs,

        /// Output format
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Print the worker provider status listing the images in use
    Images {
        #[command(flatten)]
        input: InputArgs,

        /// Output format
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Apply machine classes and update the worker status in the current kube context
    Apply {
        #[command(flatten)]
        input: InputArgs,
    },
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Plan { input, output } => {
                let plan = input.load()?.plan()?;
                println!("{}", render(&plan, output)?);
            }
            Commands::Images { input, output } => {
                let status = input.load()?.machine_images_status()?;
                println!("{}", render(&status, output)?);
            }
            Commands::Apply { input } => {
                let delegate = input.load()?;
                let client = Client::try_default()
                    .await
                    .context("failed to create kube client")?;

                delegate
                    .deploy_machine_classes(&KubeMachineClassApplier::new(client.clone()))
                    .await?;
                delegate
                    .update_machine_images_status(&KubeWorkerStatusWriter::new(client))
                    .await?;

                info!(worker = %delegate.worker().name()?, "Worker applied");
            }
        }
        Ok(())
    }
}

/// Read and parse a YAML or JSON document
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_document(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Parse a YAML document; JSON is accepted as YAML
pub fn parse_document<T: DeserializeOwned>(content: &str) -> Result<T> {
    Ok(serde_yaml::from_str(content)?)
}

/// Encode a document for printing
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_common::crd::openstack::WorkerStatus;

    #[test]
    fn parses_plan_arguments() {
        let cli = Cli::try_parse_from([
            "lattice-worker",
            "--log-format",
            "text",
            "plan",
            "--worker",
            "worker.yaml",
            "--cluster",
            "cluster.yaml",
            "--output",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.log_format, LogFormat::Text);
        match cli.command {
            Commands::Plan { input, output } => {
                assert_eq!(input.worker, PathBuf::from("worker.yaml"));
                assert_eq!(input.cluster, PathBuf::from("cluster.yaml"));
                assert_eq!(output, OutputFormat::Json);
            }
            other => panic!("Expected Plan, got {other:?}"),
        }
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let result = Cli::try_parse_from([
            "lattice-worker",
            "--log-format",
            "xml",
            "apply",
            "--worker",
            "w.yaml",
            "--cluster",
            "c.yaml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_yaml_and_json_documents() {
        let yaml = "apiVersion: openstack.provider.extensions.gardener.cloud/v1alpha1\nkind: WorkerStatus\nserverGroupDependencies:\n- poolName: pool-1\n  name: servergroup1\n  id: id1\n";
        let status: WorkerStatus = parse_document(yaml).unwrap();
        assert_eq!(status.server_group_dependency("pool-1").unwrap().id, "id1");

        let json = r#"{"machineImages": [{"name": "my-os", "version": "123", "id": "image-id"}]}"#;
        let status: WorkerStatus = parse_document(json).unwrap();
        assert_eq!(status.machine_images[0].id.as_deref(), Some("image-id"));
        assert_eq!(status.kind, "WorkerStatus");
    }

    #[test]
    fn missing_files_name_the_path() {
        let err = load_document::<WorkerStatus>(Path::new("/nonexistent/worker.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/worker.yaml"));
    }

    #[test]
    fn renders_both_formats() {
        let status = WorkerStatus::default();
        let yaml = render(&status, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("kind: WorkerStatus"));
        let json = render(&status, OutputFormat::Json).unwrap();
        assert!(json.contains("\"kind\": \"WorkerStatus\""));
    }
}
