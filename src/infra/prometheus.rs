//! Read-only Prometheus API client used to verify exporter scraping.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;

pub struct PrometheusClient {
    base_url: String,
}

/// One entry from `/api/v1/targets`.
#[derive(Debug, Deserialize)]
pub struct ActiveTarget {
    pub labels: HashMap<String, String>,
    #[serde(rename = "scrapeUrl")]
    pub scrape_url: String,
    pub health: String,
    #[serde(rename = "lastError", default)]
    pub last_error: String,
}

impl ActiveTarget {
    #[must_use]
    pub fn job(&self) -> &str {
        self.labels.get("job").map_or("", String::as_str)
    }

    #[must_use]
    pub fn is_up(&self) -> bool {
        self.health == "up"
    }
}

#[derive(Debug, Deserialize)]
struct TargetsResponse {
    data: TargetsData,
}

#[derive(Debug, Deserialize)]
struct TargetsData {
    #[serde(rename = "activeTargets")]
    active_targets: Vec<ActiveTarget>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    data: QueryData,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    result: Vec<serde_json::Value>,
}

impl PrometheusClient {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// All active scrape targets known to Prometheus.
    pub fn targets(&self) -> Result<Vec<ActiveTarget>> {
        let resp: TargetsResponse = ureq::get(&format!("{}/api/v1/targets", self.base_url))
            .call()
            .with_context(|| format!("Prometheus not reachable at {}", self.base_url))?
            .into_json()
            .context("targets response is not JSON")?;
        Ok(resp.data.active_targets)
    }

    /// Runs an instant query and returns the number of matching series.
    pub fn sample_count(&self, expr: &str) -> Result<usize> {
        let resp: QueryResponse = ureq::get(&format!("{}/api/v1/query", self.base_url))
            .query("query", expr)
            .call()
            .with_context(|| format!("query '{expr}' failed"))?
            .into_json()
            .context("query response is not JSON")?;
        Ok(resp.data.result.len())
    }
}
