//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::domain::{DeployError, RemoteTarget, SourceArchive, SourceSpec};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Captured result of one remote command.
#[derive(Clone, Debug)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The most useful diagnostic text: stderr when present, otherwise
    /// the tail of stdout.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let lines: Vec<&str> = self.stdout.lines().collect();
        let tail_start = lines.len().saturating_sub(10);
        lines[tail_start..].join("\n")
    }
}

// ── Session Transport Port ────────────────────────────────────────────────────

/// One authenticated session against a remote host.
///
/// A session is exclusively owned by one deployment run, is invalid after
/// `disconnect`, and is never pooled or reused across runs.
#[allow(async_fn_in_trait)]
pub trait SessionTransport {
    /// Run a remote command and capture its full output.
    async fn execute(&self, command: &str) -> Result<ExecOutput, DeployError>;

    /// Run a remote command, delivering stdout line-by-line through
    /// `lines` while the command is still running. The sender is dropped
    /// at stdout EOF; the returned output still carries the full text.
    async fn execute_streamed(
        &self,
        command: &str,
        lines: mpsc::Sender<String>,
    ) -> Result<ExecOutput, DeployError>;

    /// Whole-file upload over the session's authenticated channel.
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), DeployError>;

    /// Whole-file download over the session's authenticated channel.
    async fn download(&self, remote: &str, local: &Path) -> Result<(), DeployError>;

    /// Close the session. Idempotent; safe after a partial connect.
    async fn disconnect(&self) -> Result<(), DeployError>;
}

/// Opens authenticated sessions. Split from [`SessionTransport`] so the
/// orchestrator owns the connect step of its state machine while tests
/// inject canned transports.
#[allow(async_fn_in_trait)]
pub trait SessionFactory {
    type Transport: SessionTransport;

    /// Establish a session or fail with [`DeployError::Connection`].
    async fn connect(
        &self,
        target: &RemoteTarget,
        timeout: Duration,
    ) -> Result<Self::Transport, DeployError>;
}

// ── Source Packager Port ──────────────────────────────────────────────────────

/// Builds the deterministic source archive for a remote build.
#[allow(async_fn_in_trait)]
pub trait SourcePackager {
    /// Pack the declared include set into a fresh archive, or fail with
    /// [`DeployError::Packaging`] when none of the declared paths exist.
    async fn pack(&self, spec: &SourceSpec) -> Result<SourceArchive, DeployError>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Echo one line of remote build output.
    fn output(&self, line: &str);
}
