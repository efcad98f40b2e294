//! hygon-deploy: remote build and deploy tooling for the Hygon DCU
//! DCGM exporter.
//!
//! The crate is split hexagonally: `domain` holds the deployment model,
//! `application` the ports and orchestration services, `infra` the SSH,
//! packaging and monitoring adapters, and `commands` the CLI surface.

pub mod app;
pub mod application;
pub mod cli;
pub mod commands;
pub mod domain;
pub mod infra;
pub mod output;
