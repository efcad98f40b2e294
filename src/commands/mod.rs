//! CLI command handlers.

pub mod deploy;
pub mod monitor;
pub mod prepare;
pub mod version;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use crate::domain::{Credential, RemoteTarget};

/// Remote host arguments shared by `deploy` and `prepare`.
#[derive(Args)]
pub struct TargetArgs {
    /// Remote build host
    #[arg(long, env = "HYGON_DEPLOY_HOST")]
    pub host: String,

    /// SSH port
    #[arg(long, default_value_t = 22, env = "HYGON_DEPLOY_PORT")]
    pub port: u16,

    /// SSH user
    #[arg(long, default_value = "root", env = "HYGON_DEPLOY_USER")]
    pub user: String,

    /// SSH password (prefer the env var over the flag)
    #[arg(long, env = "HYGON_DEPLOY_PASSWORD")]
    pub password: Option<String>,

    /// SSH private key file, used instead of a password
    #[arg(long, env = "HYGON_DEPLOY_KEY_FILE", conflicts_with = "password")]
    pub key_file: Option<PathBuf>,

    /// Remote scratch directory for the build
    #[arg(long, default_value = "/opt/hygon-dcgm-exporter-build")]
    pub remote_dir: String,
}

impl TargetArgs {
    pub fn to_target(&self) -> Result<RemoteTarget> {
        let credential = match (&self.password, &self.key_file) {
            (Some(password), _) => Credential::Password(password.clone()),
            (None, Some(key)) => Credential::KeyFile(key.clone()),
            (None, None) => {
                bail!("no credentials: set --password, --key-file or HYGON_DEPLOY_PASSWORD")
            }
        };
        Ok(RemoteTarget {
            host: self.host.clone(),
            port: self.port,
            username: self.user.clone(),
            credential,
            remote_dir: self.remote_dir.clone(),
        })
    }
}
