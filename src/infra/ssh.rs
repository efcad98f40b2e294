//! SSH session transport built on libssh2.
//!
//! All libssh2 calls are blocking, so every operation runs inside
//! `tokio::task::spawn_blocking`. Unknown host identities are accepted
//! without verification — trust-on-first-use for ephemeral build hosts.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ssh2::Session;
use tokio::sync::mpsc;

use crate::application::ports::{ExecOutput, SessionFactory, SessionTransport};
use crate::domain::{Credential, DeployError, RemoteTarget};

/// Opens [`Ssh2Transport`] sessions.
pub struct Ssh2Factory;

impl SessionFactory for Ssh2Factory {
    type Transport = Ssh2Transport;

    async fn connect(
        &self,
        target: &RemoteTarget,
        timeout: Duration,
    ) -> Result<Ssh2Transport, DeployError> {
        let target = target.clone();
        tokio::task::spawn_blocking(move || connect_blocking(&target, timeout))
            .await
            .map_err(|e| DeployError::Connection(format!("connect task panicked: {e}")))?
    }
}

/// One live authenticated SSH session. Invalid after `disconnect`.
pub struct Ssh2Transport {
    session: Arc<Mutex<Option<Session>>>,
}

fn connect_blocking(target: &RemoteTarget, timeout: Duration) -> Result<Ssh2Transport, DeployError> {
    let addr = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|e| DeployError::Connection(format!("cannot resolve {}: {e}", target.host)))?
        .next()
        .ok_or_else(|| DeployError::Connection(format!("no address found for {}", target.host)))?;

    let tcp = TcpStream::connect_timeout(&addr, timeout)
        .map_err(|e| DeployError::Connection(format!("cannot reach {}: {e}", target.label())))?;

    let mut sess = Session::new()
        .map_err(|e| DeployError::Connection(format!("cannot create SSH session: {e}")))?;
    sess.set_tcp_stream(tcp);
    // Bound the handshake and auth; lifted again below so a long build
    // can go quiet for minutes without tripping a read timeout.
    sess.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
    sess.handshake()
        .map_err(|e| DeployError::Connection(format!("SSH handshake with {} failed: {e}", target.label())))?;

    match &target.credential {
        Credential::Password(password) => sess.userauth_password(&target.username, password),
        Credential::KeyFile(path) => sess.userauth_pubkey_file(&target.username, None, path, None),
    }
    .map_err(|e| DeployError::Connection(format!("authentication failed for {}: {e}", target.label())))?;

    if !sess.authenticated() {
        return Err(DeployError::Connection(format!(
            "authentication rejected for {}",
            target.label()
        )));
    }

    sess.set_timeout(0);
    Ok(Ssh2Transport {
        session: Arc::new(Mutex::new(Some(sess))),
    })
}

impl SessionTransport for Ssh2Transport {
    async fn execute(&self, command: &str) -> Result<ExecOutput, DeployError> {
        let session = Arc::clone(&self.session);
        let command = command.to_owned();
        spawn_ssh(move || {
            let guard = lock_session(&session)?;
            let sess = live_session(&guard)?;
            exec_blocking(sess, &command, |_| {})
        })
        .await
    }

    async fn execute_streamed(
        &self,
        command: &str,
        lines: mpsc::Sender<String>,
    ) -> Result<ExecOutput, DeployError> {
        let session = Arc::clone(&self.session);
        let command = command.to_owned();
        spawn_ssh(move || {
            let guard = lock_session(&session)?;
            let sess = live_session(&guard)?;
            exec_blocking(sess, &command, |line| {
                // A dropped receiver only stops the echo, never the build.
                let _ = lines.blocking_send(line.to_string());
            })
        })
        .await
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), DeployError> {
        let session = Arc::clone(&self.session);
        let local = local.to_path_buf();
        let remote = remote.to_owned();
        spawn_ssh(move || {
            let guard = lock_session(&session)?;
            let sess = live_session(&guard)?;
            upload_blocking(sess, &local, &remote)
        })
        .await
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<(), DeployError> {
        let session = Arc::clone(&self.session);
        let remote = remote.to_owned();
        let local = local.to_path_buf();
        spawn_ssh(move || {
            let guard = lock_session(&session)?;
            let sess = live_session(&guard)?;
            download_blocking(sess, &remote, &local)
        })
        .await
    }

    async fn disconnect(&self) -> Result<(), DeployError> {
        let session = Arc::clone(&self.session);
        spawn_ssh(move || {
            let mut guard = lock_session(&session)?;
            if let Some(sess) = guard.take() {
                let _ = sess.disconnect(None, "deployment finished", None);
            }
            Ok(())
        })
        .await
    }
}

// ── Blocking helpers ──────────────────────────────────────────────────────────

type SessionGuard<'a> = std::sync::MutexGuard<'a, Option<Session>>;

async fn spawn_ssh<T: Send + 'static>(
    f: impl FnOnce() -> Result<T, DeployError> + Send + 'static,
) -> Result<T, DeployError> {
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DeployError::Connection(format!("SSH task panicked: {e}")))?
}

fn lock_session(session: &Mutex<Option<Session>>) -> Result<SessionGuard<'_>, DeployError> {
    session
        .lock()
        .map_err(|_| DeployError::Connection("SSH session lock poisoned".into()))
}

fn live_session<'a>(guard: &'a SessionGuard<'_>) -> Result<&'a Session, DeployError> {
    guard
        .as_ref()
        .ok_or_else(|| DeployError::Connection("SSH session already disconnected".into()))
}

fn exec_blocking(
    sess: &Session,
    command: &str,
    mut on_line: impl FnMut(&str),
) -> Result<ExecOutput, DeployError> {
    let exec_err = |e: ssh2::Error| DeployError::Connection(format!("remote execution failed: {e}"));

    let mut channel = sess.channel_session().map_err(exec_err)?;
    // Merge stderr into the main stream. Draining a single stream cannot
    // stall against a full stderr window, and error text still reaches
    // the operator (and the diagnostic tail) in arrival order.
    channel
        .handle_extended_data(ssh2::ExtendedData::Merge)
        .map_err(exec_err)?;
    channel.exec(command).map_err(exec_err)?;

    let mut stdout = String::new();
    {
        let reader = BufReader::new(&mut channel);
        for line in reader.lines() {
            let line = line
                .map_err(|e| DeployError::Connection(format!("reading remote output: {e}")))?;
            on_line(&line);
            stdout.push_str(&line);
            stdout.push('\n');
        }
    }

    channel.wait_close().map_err(exec_err)?;
    let exit_code = channel.exit_status().map_err(exec_err)?;

    Ok(ExecOutput {
        exit_code,
        stdout,
        stderr: String::new(),
    })
}

fn upload_blocking(sess: &Session, local: &Path, remote: &str) -> Result<(), DeployError> {
    let xfer = |e: ssh2::Error| DeployError::Transfer(format!("uploading {remote}: {e}"));

    let mut file = File::open(local)
        .map_err(|e| DeployError::Transfer(format!("cannot open {}: {e}", local.display())))?;
    let size = file
        .metadata()
        .map_err(|e| DeployError::Transfer(format!("cannot stat {}: {e}", local.display())))?
        .len();

    let mut channel = sess
        .scp_send(Path::new(remote), 0o644, size, None)
        .map_err(xfer)?;
    std::io::copy(&mut file, &mut channel)
        .map_err(|e| DeployError::Transfer(format!("upload interrupted for {remote}: {e}")))?;

    channel.send_eof().map_err(xfer)?;
    channel.wait_eof().map_err(xfer)?;
    channel.close().map_err(xfer)?;
    channel.wait_close().map_err(xfer)?;
    Ok(())
}

fn download_blocking(sess: &Session, remote: &str, local: &Path) -> Result<(), DeployError> {
    let xfer = |e: ssh2::Error| DeployError::Transfer(format!("downloading {remote}: {e}"));

    let (mut channel, stat) = sess
        .scp_recv(Path::new(remote))
        .map_err(|e| DeployError::Transfer(format!("remote path {remote} not found: {e}")))?;

    let mut file = File::create(local)
        .map_err(|e| DeployError::Transfer(format!("cannot create {}: {e}", local.display())))?;
    let mut limited = (&mut channel).take(stat.size());
    std::io::copy(&mut limited, &mut file)
        .map_err(|e| DeployError::Transfer(format!("download interrupted for {remote}: {e}")))?;

    channel.send_eof().map_err(xfer)?;
    channel.wait_eof().map_err(xfer)?;
    channel.close().map_err(xfer)?;
    channel.wait_close().map_err(xfer)?;
    Ok(())
}
