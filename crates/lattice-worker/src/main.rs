//! Lattice worker planner CLI

use clap::Parser;

use lattice_common::telemetry::{init_telemetry, TelemetryConfig};
use lattice_worker::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(TelemetryConfig {
        format: cli.log_format,
        ..Default::default()
    })?;

    cli.run().await
}
