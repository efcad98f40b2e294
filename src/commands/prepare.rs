//! `prepare` — one-off provisioning of a remote build host.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::{ProgressReporter, SessionFactory, SessionTransport};
use crate::application::services::deploy::CONNECT_TIMEOUT;
use crate::application::services::prepare::prepare_environment;
use crate::commands::TargetArgs;
use crate::infra::Ssh2Factory;
use crate::output::reporter::TerminalReporter;

#[derive(Args)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

pub async fn run(args: &PrepareArgs, app: &AppContext) -> Result<()> {
    let target = args.target.to_target()?;
    let reporter = TerminalReporter::new(&app.output);

    reporter.step(&format!("connecting to {}", target.label()));
    let transport = Ssh2Factory.connect(&target, CONNECT_TIMEOUT).await?;

    let result = prepare_environment(&transport, &reporter).await;
    if let Err(e) = transport.disconnect().await {
        app.output.warn(&format!("disconnect failed: {e}"));
    }
    result
}
