//! Hand-rolled recording mocks for the application ports.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use hygon_deploy::application::ports::{
    ExecOutput, ProgressReporter, SessionFactory, SessionTransport, SourcePackager,
};
use hygon_deploy::domain::{DeployError, RemoteTarget, SourceArchive, SourceSpec};

pub fn ok(stdout: &str) -> ExecOutput {
    ExecOutput {
        exit_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn fail(stderr: &str) -> ExecOutput {
    ExecOutput {
        exit_code: 1,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

type Responder = dyn Fn(&str) -> ExecOutput + Send + Sync;

/// Transport that records every call and answers commands through an
/// injected responder closure.
#[derive(Clone)]
pub struct MockTransport {
    pub commands: Arc<Mutex<Vec<String>>>,
    pub uploads: Arc<Mutex<Vec<(PathBuf, String)>>>,
    pub downloads: Arc<Mutex<Vec<(String, PathBuf)>>>,
    pub disconnects: Arc<Mutex<usize>>,
    responder: Arc<Responder>,
    missing_downloads: Arc<Mutex<Vec<String>>>,
    failing_uploads: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub fn new(responder: impl Fn(&str) -> ExecOutput + Send + Sync + 'static) -> Self {
        Self {
            commands: Arc::new(Mutex::new(Vec::new())),
            uploads: Arc::new(Mutex::new(Vec::new())),
            downloads: Arc::new(Mutex::new(Vec::new())),
            disconnects: Arc::new(Mutex::new(0)),
            responder: Arc::new(responder),
            missing_downloads: Arc::new(Mutex::new(Vec::new())),
            failing_uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn all_ok() -> Self {
        Self::new(|_| ok(""))
    }

    /// Make downloads of `remote` fail as if the file were absent.
    pub fn deny_download(&self, remote: &str) {
        self.missing_downloads
            .lock()
            .expect("lock")
            .push(remote.to_string());
    }

    /// Make uploads to `remote` fail mid-transfer.
    pub fn deny_upload(&self, remote: &str) {
        self.failing_uploads
            .lock()
            .expect("lock")
            .push(remote.to_string());
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.commands
            .lock()
            .expect("lock")
            .iter()
            .any(|c| c.contains(needle))
    }

    pub fn runs_of(&self, needle: &str) -> usize {
        self.commands
            .lock()
            .expect("lock")
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }
}

impl SessionTransport for MockTransport {
    async fn execute(&self, command: &str) -> Result<ExecOutput, DeployError> {
        self.commands
            .lock()
            .expect("lock")
            .push(command.to_string());
        Ok((self.responder)(command))
    }

    async fn execute_streamed(
        &self,
        command: &str,
        lines: mpsc::Sender<String>,
    ) -> Result<ExecOutput, DeployError> {
        self.commands
            .lock()
            .expect("lock")
            .push(command.to_string());
        let out = (self.responder)(command);
        for line in out.stdout.lines() {
            let _ = lines.send(line.to_string()).await;
        }
        Ok(out)
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), DeployError> {
        self.uploads
            .lock()
            .expect("lock")
            .push((local.to_path_buf(), remote.to_string()));
        if self
            .failing_uploads
            .lock()
            .expect("lock")
            .iter()
            .any(|r| r == remote)
        {
            return Err(DeployError::Transfer(format!(
                "upload interrupted for {remote}"
            )));
        }
        Ok(())
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<(), DeployError> {
        self.downloads
            .lock()
            .expect("lock")
            .push((remote.to_string(), local.to_path_buf()));
        if self
            .missing_downloads
            .lock()
            .expect("lock")
            .iter()
            .any(|r| r == remote)
        {
            return Err(DeployError::Transfer(format!(
                "remote path {remote} not found"
            )));
        }
        std::fs::write(local, b"bundle-bytes")
            .map_err(|e| DeployError::Transfer(e.to_string()))?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DeployError> {
        *self.disconnects.lock().expect("lock") += 1;
        Ok(())
    }
}

pub struct MockFactory {
    pub transport: MockTransport,
    pub fail_connect: bool,
}

impl MockFactory {
    pub fn new(transport: MockTransport) -> Self {
        Self {
            transport,
            fail_connect: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            transport: MockTransport::all_ok(),
            fail_connect: true,
        }
    }
}

impl SessionFactory for MockFactory {
    type Transport = MockTransport;

    async fn connect(
        &self,
        target: &RemoteTarget,
        _timeout: Duration,
    ) -> Result<MockTransport, DeployError> {
        if self.fail_connect {
            return Err(DeployError::Connection(format!(
                "mock refused connection to {}",
                target.label()
            )));
        }
        Ok(self.transport.clone())
    }
}

/// Packager that writes a small real archive file so the deployment's
/// delete-after-upload behavior can be observed on disk.
pub struct MockPackager {
    pub dir: tempfile::TempDir,
}

impl MockPackager {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn archive_path(&self) -> PathBuf {
        self.dir
            .path()
            .join("hygon-dcgm-exporter-source-20240101-120000.tar.gz")
    }
}

impl SourcePackager for MockPackager {
    async fn pack(&self, _spec: &SourceSpec) -> Result<SourceArchive, DeployError> {
        let path = self.archive_path();
        std::fs::write(&path, b"archive-bytes")
            .map_err(|e| DeployError::Packaging(e.to_string()))?;
        Ok(SourceArchive {
            path,
            byte_size: 13,
            sha256: "deadbeef".repeat(8),
            manifest: vec![
                "Makefile".into(),
                "cmd/dcgm-exporter/main.go".into(),
                "go.mod".into(),
                "go.sum".into(),
            ],
        })
    }
}

/// Reporter that records every event for assertion.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    pub steps: Arc<Mutex<Vec<String>>>,
    pub successes: Arc<Mutex<Vec<String>>>,
    pub warnings: Arc<Mutex<Vec<String>>>,
    pub lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warned(&self, needle: &str) -> bool {
        self.warnings
            .lock()
            .expect("lock")
            .iter()
            .any(|w| w.contains(needle))
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.steps.lock().expect("lock").push(message.to_string());
    }

    fn success(&self, message: &str) {
        self.successes
            .lock()
            .expect("lock")
            .push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings
            .lock()
            .expect("lock")
            .push(message.to_string());
    }

    fn output(&self, line: &str) {
        self.lines.lock().expect("lock").push(line.to_string());
    }
}

pub fn test_target(remote_dir: &str) -> RemoteTarget {
    RemoteTarget {
        host: "build-host".into(),
        port: 22,
        username: "root".into(),
        credential: hygon_deploy::domain::Credential::Password("secret".into()),
        remote_dir: remote_dir.to_string(),
    }
}
