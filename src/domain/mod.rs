//! Domain types and errors.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! or `crate::application`. Pure data and pure logic only.

pub mod artifact;
pub mod build;
pub mod error;
pub mod source;
pub mod target;

pub use artifact::Artifact;
pub use build::{BuildPlan, Stage, StageName};
pub use error::DeployError;
pub use source::{SourceArchive, SourceSpec};
pub use target::{Credential, RemoteTarget};
