//! Minimal Grafana HTTP API client for wiring up exporter monitoring.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};

const DATASOURCE_NAME: &str = "Prometheus";

/// How to authenticate against the Grafana API.
pub enum GrafanaAuth {
    Basic { username: String, password: String },
    Token(String),
}

/// Whether `ensure_datasource` found or created the datasource.
#[derive(Debug, PartialEq, Eq)]
pub enum DatasourceOutcome {
    AlreadyPresent,
    Created,
}

pub struct GrafanaClient {
    base_url: String,
    auth_header: String,
}

impl GrafanaClient {
    #[must_use]
    pub fn new(base_url: &str, auth: &GrafanaAuth) -> Self {
        let auth_header = match auth {
            GrafanaAuth::Basic { username, password } => {
                format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
            }
            GrafanaAuth::Token(token) => format!("Bearer {token}"),
        };
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            auth_header,
        }
    }

    /// Probes `/api/health` and returns the reported Grafana version.
    pub fn check_health(&self) -> Result<String> {
        let body: Value = ureq::get(&format!("{}/api/health", self.base_url))
            .set("Authorization", &self.auth_header)
            .call()
            .with_context(|| format!("Grafana not reachable at {}", self.base_url))?
            .into_json()
            .context("Grafana health response is not JSON")?;
        Ok(body["version"].as_str().unwrap_or("unknown").to_owned())
    }

    /// Creates the Prometheus datasource unless one with the standard
    /// name already exists.
    pub fn ensure_datasource(&self, prometheus_url: &str) -> Result<DatasourceOutcome> {
        let lookup = ureq::get(&format!(
            "{}/api/datasources/name/{DATASOURCE_NAME}",
            self.base_url
        ))
        .set("Authorization", &self.auth_header)
        .call();

        match lookup {
            Ok(_) => return Ok(DatasourceOutcome::AlreadyPresent),
            Err(ureq::Error::Status(404, _)) => {}
            Err(e) => return Err(anyhow!(e).context("looking up Prometheus datasource")),
        }

        ureq::post(&format!("{}/api/datasources", self.base_url))
            .set("Authorization", &self.auth_header)
            .send_json(json!({
                "name": DATASOURCE_NAME,
                "type": "prometheus",
                "url": prometheus_url,
                "access": "proxy",
                "isDefault": true,
                "basicAuth": false,
            }))
            .context("creating Prometheus datasource")?;
        Ok(DatasourceOutcome::Created)
    }

    /// Creates a dashboard folder, returning its numeric id. An existing
    /// folder with the same title is looked up instead of recreated.
    pub fn ensure_folder(&self, title: &str) -> Result<i64> {
        let created = ureq::post(&format!("{}/api/folders", self.base_url))
            .set("Authorization", &self.auth_header)
            .send_json(json!({ "title": title }));

        match created {
            Ok(resp) => {
                let body: Value = resp.into_json().context("folder response is not JSON")?;
                body["id"]
                    .as_i64()
                    .ok_or_else(|| anyhow!("folder response has no id"))
            }
            // 409/412: a folder with this title (or uid) already exists.
            Err(ureq::Error::Status(409 | 412, _)) => self.find_folder(title),
            Err(e) => Err(anyhow!(e).context("creating dashboard folder")),
        }
    }

    fn find_folder(&self, title: &str) -> Result<i64> {
        let folders: Value = ureq::get(&format!("{}/api/folders", self.base_url))
            .set("Authorization", &self.auth_header)
            .call()
            .context("listing dashboard folders")?
            .into_json()
            .context("folder list is not JSON")?;
        folders
            .as_array()
            .into_iter()
            .flatten()
            .find(|f| f["title"].as_str() == Some(title))
            .and_then(|f| f["id"].as_i64())
            .ok_or_else(|| anyhow!("folder '{title}' not found after conflict"))
    }

    /// Imports a dashboard JSON model, overwriting any prior import.
    /// Returns the dashboard URL path reported by Grafana.
    pub fn import_dashboard(&self, dashboard: Value, folder_id: Option<i64>) -> Result<String> {
        let mut payload = json!({
            "dashboard": dashboard,
            "overwrite": true,
            "inputs": [{
                "name": "DS_PROMETHEUS",
                "type": "datasource",
                "pluginId": "prometheus",
                "value": DATASOURCE_NAME,
            }],
        });
        if let Some(id) = folder_id {
            payload["folderId"] = json!(id);
        }

        let body: Value = ureq::post(&format!("{}/api/dashboards/import", self.base_url))
            .set("Authorization", &self.auth_header)
            .send_json(payload)
            .context("importing dashboard")?
            .into_json()
            .context("import response is not JSON")?;

        body["importedUrl"]
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| anyhow!("import succeeded but no dashboard URL was returned: {body}"))
    }
}
