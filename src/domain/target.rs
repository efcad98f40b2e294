//! Remote build host description.

use std::path::PathBuf;

/// How to authenticate against the remote host.
#[derive(Clone)]
pub enum Credential {
    /// Plain password auth, as used against ephemeral build boxes.
    Password(String),
    /// Private key file auth.
    KeyFile(PathBuf),
}

impl std::fmt::Debug for Credential {
    // Never print the secret itself.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Credential::Password(***)"),
            Self::KeyFile(path) => write!(f, "Credential::KeyFile({})", path.display()),
        }
    }
}

/// A remote build host. Immutable once a deployment run starts.
#[derive(Clone, Debug)]
pub struct RemoteTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credential: Credential,
    /// Remote scratch directory the build runs in. Purged at the end of
    /// every run, success or failure.
    pub remote_dir: String,
}

impl RemoteTarget {
    /// `user@host:port` label for operator-facing messages.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}
