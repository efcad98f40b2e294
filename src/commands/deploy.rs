//! `deploy` — the full package / build / download pipeline.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::deploy::Deployment;
use crate::commands::TargetArgs;
use crate::domain::SourceSpec;
use crate::infra::{Ssh2Factory, TarGzPackager};
use crate::output::reporter::TerminalReporter;

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Local exporter working tree to package
    #[arg(long, default_value = ".")]
    pub source_root: PathBuf,

    /// Local directory the deployment bundle is downloaded into
    #[arg(long, default_value = "downloads")]
    pub download_dir: PathBuf,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn run(args: &DeployArgs, app: &AppContext) -> Result<()> {
    let target = args.target.to_target()?;

    app.output.header("Remote build & deploy");
    app.output.kv("Target", &target.label());
    app.output.kv("Remote dir", &target.remote_dir);
    app.output.kv("Source root", &args.source_root.display().to_string());
    app.output.kv("Downloads", &args.download_dir.display().to_string());

    if !args.yes && !app.non_interactive && !confirm("Start the remote build?")? {
        app.output.info("cancelled");
        return Ok(());
    }

    let spec = SourceSpec::exporter_defaults(args.source_root.clone());
    let reporter = TerminalReporter::new(&app.output);
    let mut deployment = Deployment::new();
    let outcome = deployment
        .run(
            &Ssh2Factory,
            &TarGzPackager,
            &reporter,
            &target,
            &spec,
            &args.download_dir,
        )
        .await?;

    let bundle = outcome.artifact.local_path.display().to_string();
    app.output.success("deployment bundle ready");
    app.output.kv("Package", &outcome.artifact.package_name);
    app.output.kv("Bundle", &bundle);
    app.output
        .kv("Size", &format!("{} bytes", outcome.artifact.byte_size));

    app.output.header("Install on a DCU node");
    app.output.info(&format!("  tar -xzf {bundle}"));
    app.output
        .info(&format!("  cd {}", outcome.artifact.package_name));
    app.output.info("  sudo ./install.sh   # systemd service");
    app.output.info("  ./start.sh          # or run in foreground");
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N]: ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
