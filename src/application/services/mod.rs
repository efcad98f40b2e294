//! Use-case services. I/O is routed through port traits only.

pub mod build;
pub mod deploy;
pub mod prepare;
pub mod retrieve;
