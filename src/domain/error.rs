//! Typed deployment error taxonomy.
//!
//! Every failure in a deployment run maps to exactly one of these variants.
//! Within a stage, a narrowly-scoped fallback is attempted once before the
//! stage is declared failed; there is no automatic cross-run retry.

use thiserror::Error;

use crate::domain::build::StageName;

/// Errors raised by a deployment run.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Transport-level failure: auth, network unreachable, timeout.
    /// Retryable by the operator, never automatically.
    #[error("connection error: {0}")]
    Connection(String),

    /// Local precondition violation while packaging source. Fatal.
    #[error("packaging error: {0}")]
    Packaging(String),

    /// Upload/download I/O failure. Fatal for the run.
    #[error("transfer error: {0}")]
    Transfer(String),

    /// Remote build procedure failure, carrying the failed stage and the
    /// captured diagnostic text.
    #[error("build failed at stage '{stage}': {message}")]
    Build { stage: StageName, message: String },

    /// Post-build inconsistency: the build reported success but the
    /// artifact could not be located or downloaded.
    #[error("artifact retrieval error: {0}")]
    Retrieval(String),
}

impl DeployError {
    /// The stage a `Build` error failed at, if any.
    #[must_use]
    pub fn failed_stage(&self) -> Option<StageName> {
        match self {
            Self::Build { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
