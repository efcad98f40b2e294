//! Command line definition and dispatch.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::AppContext;
use crate::commands;

#[derive(Parser)]
#[command(
    name = "hygon-deploy",
    about = "Build the Hygon DCU DCGM exporter on a remote host and fetch the deployment bundle",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Machine-readable JSON output where supported
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress progress and informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output (also honors `NO_COLOR`)
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Package local source, build it remotely and download the bundle
    Deploy(commands::deploy::DeployArgs),
    /// Install build prerequisites on a fresh remote host
    Prepare(commands::prepare::PrepareArgs),
    /// Grafana/Prometheus monitoring helpers
    #[command(subcommand)]
    Monitor(commands::monitor::MonitorCommand),
    /// Print version information
    Version,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let app = AppContext::new(self.no_color, self.quiet);
        match self.command {
            Command::Deploy(args) => commands::deploy::run(&args, &app).await,
            Command::Prepare(args) => commands::prepare::run(&args, &app).await,
            Command::Monitor(cmd) => commands::monitor::run(&cmd, &app),
            Command::Version => commands::version::run(self.json),
        }
    }
}
