//! Deployment orchestrator — sequences connect, pack, upload, build,
//! download, and cleanup as a strict state machine.
//!
//! `Idle → Connected → Packaged → Uploaded → Built → Downloaded →
//! CleanedUp → Done`, with `Failed` reachable from any state. On failure
//! the remote working directory is still purged best-effort and the
//! session is always disconnected; cleanup trouble is logged, never
//! escalated — the run's outcome is governed by the original failure.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::ports::{
    ProgressReporter, SessionFactory, SessionTransport, SourcePackager,
};
use crate::application::services::build::{BuildReport, run_build_plan};
use crate::application::services::retrieve::retrieve_artifact;
use crate::domain::artifact::Artifact;
use crate::domain::build::BuildPlan;
use crate::domain::error::DeployError;
use crate::domain::source::SourceSpec;
use crate::domain::target::RemoteTarget;

/// Default SSH connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a deployment run currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeployState {
    Idle,
    Connected,
    Packaged,
    Uploaded,
    Built,
    Downloaded,
    CleanedUp,
    Done,
    Failed,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct DeployOutcome {
    pub artifact: Artifact,
    pub report: BuildReport,
}

/// One deployment run. Owns exactly one session from connect to
/// disconnect; never reused across runs.
pub struct Deployment {
    state: DeployState,
    /// Local source archive path, tracked so every abort path can remove it.
    archive_path: Option<PathBuf>,
}

impl Default for Deployment {
    fn default() -> Self {
        Self::new()
    }
}

impl Deployment {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DeployState::Idle,
            archive_path: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> DeployState {
        self.state
    }

    /// Drive the full deployment end-to-end.
    ///
    /// # Errors
    ///
    /// Returns the first hard failure of any step; cleanup and disconnect
    /// are still attempted before the error is surfaced.
    pub async fn run(
        &mut self,
        factory: &impl SessionFactory,
        packager: &impl SourcePackager,
        reporter: &impl ProgressReporter,
        target: &RemoteTarget,
        spec: &SourceSpec,
        download_dir: &Path,
    ) -> Result<DeployOutcome, DeployError> {
        reporter.step(&format!("connecting to {}", target.label()));
        let transport = match factory.connect(target, CONNECT_TIMEOUT).await {
            Ok(t) => t,
            Err(e) => {
                self.state = DeployState::Failed;
                return Err(e);
            }
        };
        self.state = DeployState::Connected;
        reporter.success(&format!("connected to {}", target.label()));

        let result = self
            .run_connected(&transport, packager, reporter, target, spec, download_dir)
            .await;

        if result.is_err() {
            self.remove_local_archive();
            cleanup_remote(&transport, reporter, &target.remote_dir).await;
        }

        if let Err(e) = transport.disconnect().await {
            reporter.warn(&format!("disconnect failed: {e}"));
        }

        match result {
            Ok(outcome) => {
                self.state = DeployState::Done;
                Ok(outcome)
            }
            Err(e) => {
                self.state = DeployState::Failed;
                Err(e)
            }
        }
    }

    async fn run_connected(
        &mut self,
        transport: &impl SessionTransport,
        packager: &impl SourcePackager,
        reporter: &impl ProgressReporter,
        target: &RemoteTarget,
        spec: &SourceSpec,
        download_dir: &Path,
    ) -> Result<DeployOutcome, DeployError> {
        // Pack.
        reporter.step("packaging source");
        let archive = packager.pack(spec).await?;
        self.archive_path = Some(archive.path.clone());
        self.state = DeployState::Packaged;
        reporter.success(&format!(
            "source archive ready: {} files, {} bytes, sha256 {}",
            archive.manifest.len(),
            archive.byte_size,
            &archive.sha256[..archive.sha256.len().min(12)],
        ));

        // Upload into a clean remote working directory.
        let remote_dir = &target.remote_dir;
        let archive_name = archive
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DeployError::Packaging("archive path has no file name".into()))?;

        reporter.step(&format!("uploading {archive_name} to {remote_dir}"));
        let prep = transport
            .execute(&format!("mkdir -p {remote_dir} && rm -rf {remote_dir}/*"))
            .await?;
        if !prep.success() {
            return Err(DeployError::Transfer(format!(
                "cannot prepare remote directory {remote_dir}: {}",
                prep.diagnostic()
            )));
        }
        transport
            .upload(&archive.path, &format!("{remote_dir}/{archive_name}"))
            .await?;
        // The archive is done once it is on the remote host.
        self.remove_local_archive();
        self.state = DeployState::Uploaded;
        reporter.success("upload complete");

        // Build.
        let plan = BuildPlan::new(remote_dir, &archive_name);
        let report = run_build_plan(transport, reporter, &plan).await?;
        self.state = DeployState::Built;
        reporter.success("remote build complete");

        // Download.
        let artifact = retrieve_artifact(transport, reporter, remote_dir, download_dir).await?;
        self.state = DeployState::Downloaded;

        // Cleanup on the success path; failure here is logged only.
        cleanup_remote(transport, reporter, remote_dir).await;
        self.state = DeployState::CleanedUp;

        Ok(DeployOutcome { artifact, report })
    }

    fn remove_local_archive(&mut self) {
        if let Some(path) = self.archive_path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Purge the remote working directory, best-effort.
async fn cleanup_remote(
    transport: &impl SessionTransport,
    reporter: &impl ProgressReporter,
    remote_dir: &str,
) {
    reporter.step("cleaning up remote build directory");
    match transport.execute(&format!("rm -rf {remote_dir}")).await {
        Ok(out) if out.success() => reporter.success("remote cleanup complete"),
        Ok(out) => reporter.warn(&format!("remote cleanup failed: {}", out.diagnostic())),
        Err(e) => reporter.warn(&format!("remote cleanup failed: {e}")),
    }
}
