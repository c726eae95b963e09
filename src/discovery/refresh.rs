//! Refresh pass — probe every configured target and rebuild the cache.
//!
//! Targets are probed one after another. A failing target is logged and
//! skipped; it never aborts the pass. Passes are serialized, so a manual
//! `/refresh` and a scheduled tick never interleave.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::prober::Probe;
use super::resolver::DocPaths;
use super::DiscoveredEntry;
use crate::cache::ServiceCache;
use crate::config::Targets;

pub struct Refresher {
    targets: Targets,
    paths: DocPaths,
    prober: Arc<dyn Probe>,
    cache: ServiceCache,
    pass_lock: Mutex<()>,
}

impl Refresher {
    pub fn new(targets: Targets, paths: DocPaths, prober: Arc<dyn Probe>, cache: ServiceCache) -> Self {
        Self {
            targets,
            paths,
            prober,
            cache,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &ServiceCache {
        &self.cache
    }

    /// Run one full pass. Returns how many targets were discovered.
    pub async fn refresh(&self) -> usize {
        let _pass = self.pass_lock.lock().await;
        let pass_id = Uuid::new_v4();
        let started = Instant::now();
        info!(pass_id = %pass_id, targets = self.targets.len(), "Refresh start");

        let entries = match &self.targets {
            Targets::Services(services) => {
                warn!(
                    "The SERVICES, VERSIONS and APIDOCS_EXTENSION environment variables are deprecated, \
                     it is recommended to use the OPENAPI_URLS variable instead"
                );
                self.scan_services(services).await
            }
            Targets::OpenApiUrls(urls) => self.scan_urls(urls).await,
        };

        let discovered = entries.len();
        self.cache.replace(entries).await;

        info!(
            pass_id = %pass_id,
            discovered = discovered,
            missing = self.targets.len() - discovered,
            duration_ms = started.elapsed().as_millis() as u64,
            "Refresh finish"
        );
        discovered
    }

    async fn scan_services(&self, services: &[String]) -> Vec<DiscoveredEntry> {
        let mut entries = Vec::new();
        for service in services {
            if let Some(entry) = self.paths.resolve(self.prober.as_ref(), service).await {
                entries.push(entry);
            }
        }
        entries
    }

    async fn scan_urls(&self, urls: &[String]) -> Vec<DiscoveredEntry> {
        let mut entries = Vec::new();
        for url in urls {
            if self.prober.probe(url).await {
                entries.push(entry_for_url(url));
            } else {
                info!(url = %url, "Schema not reachable — skipping");
            }
        }
        entries
    }
}

/// Listing entry for an explicit API-doc URL.
///
/// The name is the URL's host. Hosts with a dot are public, so the full URL
/// is linked; dotless hosts are in-cluster services reached through this
/// ingress at `/<host>`.
pub fn entry_for_url(url: &str) -> DiscoveredEntry {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest
        .split(|c: char| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or(rest);

    let link = if host.contains('.') {
        url.to_string()
    } else {
        format!("/{}", host)
    };

    DiscoveredEntry {
        name: host.to_string(),
        url: link,
    }
}
