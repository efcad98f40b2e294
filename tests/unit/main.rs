//! Unit test aggregate: service-level tests driven through mock ports.

mod mocks;

mod build_driver;
mod deploy_service;
