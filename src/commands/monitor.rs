//! `monitor` — wire the exporter into Grafana/Prometheus and verify it.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::infra::{DatasourceOutcome, GrafanaAuth, GrafanaClient, PrometheusClient};

#[derive(Subcommand)]
pub enum MonitorCommand {
    /// Connect Grafana to Prometheus and import the exporter dashboard
    Setup(SetupArgs),
    /// Check that Prometheus is scraping the exporter
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct SetupArgs {
    /// Grafana base URL
    #[arg(long, default_value = "http://localhost:3000", env = "GRAFANA_URL")]
    pub grafana_url: String,

    /// Grafana admin user
    #[arg(long, default_value = "admin", env = "GRAFANA_USER")]
    pub grafana_user: String,

    /// Grafana admin password
    #[arg(long, env = "GRAFANA_PASSWORD")]
    pub grafana_password: Option<String>,

    /// Grafana API token, used instead of basic auth
    #[arg(long, env = "GRAFANA_TOKEN", conflicts_with = "grafana_password")]
    pub grafana_token: Option<String>,

    /// Prometheus URL the datasource should point at
    #[arg(long, default_value = "http://localhost:9090", env = "PROMETHEUS_URL")]
    pub prometheus_url: String,

    /// Dashboard JSON model to import
    #[arg(long)]
    pub dashboard: Option<PathBuf>,

    /// Folder the dashboard is imported into
    #[arg(long, default_value = "DCU Monitoring")]
    pub folder: String,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Prometheus base URL
    #[arg(long, default_value = "http://localhost:9090", env = "PROMETHEUS_URL")]
    pub prometheus_url: String,

    /// Scrape job name the exporter registers under
    #[arg(long, default_value = "hygon-dcgm-exporter")]
    pub job: String,

    /// Instant query whose series count is reported
    #[arg(long)]
    pub query: Option<String>,
}

pub fn run(cmd: &MonitorCommand, app: &AppContext) -> Result<()> {
    match cmd {
        MonitorCommand::Setup(args) => setup(args, app),
        MonitorCommand::Verify(args) => verify(args, app),
    }
}

fn setup(args: &SetupArgs, app: &AppContext) -> Result<()> {
    let auth = match (&args.grafana_token, &args.grafana_password) {
        (Some(token), _) => GrafanaAuth::Token(token.clone()),
        (None, Some(password)) => GrafanaAuth::Basic {
            username: args.grafana_user.clone(),
            password: password.clone(),
        },
        (None, None) => bail!("no Grafana credentials: set --grafana-password or --grafana-token"),
    };
    let grafana = GrafanaClient::new(&args.grafana_url, &auth);

    app.output.header("Monitoring setup");
    let version = grafana.check_health()?;
    app.output.success(&format!("Grafana reachable (v{version})"));

    match grafana.ensure_datasource(&args.prometheus_url)? {
        DatasourceOutcome::Created => app
            .output
            .success(&format!("Prometheus datasource created -> {}", args.prometheus_url)),
        DatasourceOutcome::AlreadyPresent => {
            app.output.info("Prometheus datasource already present");
        }
    }

    if let Some(path) = &args.dashboard {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read dashboard {}", path.display()))?;
        let model = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not valid dashboard JSON", path.display()))?;
        let folder_id = grafana.ensure_folder(&args.folder)?;
        let url = grafana.import_dashboard(model, Some(folder_id))?;
        app.output
            .success(&format!("dashboard imported: {}{url}", args.grafana_url));
    }
    Ok(())
}

fn verify(args: &VerifyArgs, app: &AppContext) -> Result<()> {
    let prometheus = PrometheusClient::new(&args.prometheus_url);

    app.output.header("Scrape verification");
    let targets = prometheus.targets()?;
    let matching: Vec<_> = targets.iter().filter(|t| t.job() == args.job).collect();
    if matching.is_empty() {
        bail!(
            "no scrape target with job '{}' — check the Prometheus scrape config",
            args.job
        );
    }

    let mut down = 0usize;
    for target in &matching {
        if target.is_up() {
            app.output
                .success(&format!("{} is up", target.scrape_url));
        } else {
            down += 1;
            app.output.warn(&format!(
                "{} is {}: {}",
                target.scrape_url, target.health, target.last_error
            ));
        }
    }

    if let Some(expr) = &args.query {
        let count = prometheus.sample_count(expr)?;
        app.output
            .kv("Series", &format!("{count} for '{expr}'"));
    }

    if down > 0 {
        bail!("{down} of {} exporter targets are not up", matching.len());
    }
    Ok(())
}
