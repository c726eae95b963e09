//! Version resolver — picks the doc path a bare service name answers on.
//!
//! Candidates are `<service>/<version>/api-docs[<ext>]` for every version,
//! or just `<service>/<schema path>` when a schema path is configured.
//! Every candidate is probed in order and the LAST reachable one wins.

use tracing::info;

use super::prober::Probe;
use super::DiscoveredEntry;
use crate::config::Config;

#[derive(Debug, Clone)]
pub struct DocPaths {
    versions: Vec<String>,
    extension: Option<String>,
    schema_path: Option<String>,
}

impl DocPaths {
    pub fn new(versions: Vec<String>, extension: Option<String>, schema_path: Option<String>) -> Self {
        Self { versions, extension, schema_path }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.versions.clone(),
            config.extension.clone(),
            config.schema_path.clone(),
        )
    }

    /// Candidate paths for `service`, without scheme or leading slash.
    pub fn candidates(&self, service: &str) -> Vec<String> {
        if let Some(path) = &self.schema_path {
            return vec![format!("{}/{}", service, path)];
        }
        let ext = self.extension.as_deref().unwrap_or("");
        self.versions
            .iter()
            .map(|version| format!("{}/{}/api-docs{}", service, version, ext))
            .collect()
    }

    /// Probe every candidate over plain HTTP; at most one entry comes back.
    pub async fn resolve(&self, prober: &dyn Probe, service: &str) -> Option<DiscoveredEntry> {
        let mut resolved = None;
        for path in self.candidates(service) {
            if prober.probe(&format!("http://{}", path)).await {
                resolved = Some(path);
            }
        }

        match &resolved {
            Some(path) => info!(service = %service, "Resolved API docs at /{}", path),
            None => info!(service = %service, "No API docs found"),
        }

        resolved.map(|path| DiscoveredEntry {
            name: service.to_string(),
            url: format!("/{}", path),
        })
    }
}
