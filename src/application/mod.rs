//! Application layer — use-case services over injected ports.

pub mod ports;
pub mod services;
