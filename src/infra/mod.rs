//! Infrastructure adapters backing the application ports.

pub mod grafana;
pub mod packager;
pub mod prometheus;
pub mod ssh;

pub use grafana::{DatasourceOutcome, GrafanaAuth, GrafanaClient};
pub use packager::TarGzPackager;
pub use prometheus::PrometheusClient;
pub use ssh::{Ssh2Factory, Ssh2Transport};
