//! Service cache — the latest set of discovered API-doc endpoints.
//!
//! Refresh passes build their result off to the side and swap it in whole,
//! so readers always see a complete pass, never a half-built list.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::discovery::DiscoveredEntry;

#[derive(Clone, Default)]
pub struct ServiceCache {
    entries: Arc<RwLock<Arc<Vec<DiscoveredEntry>>>>,
}

impl ServiceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entries. Cheap: clones the snapshot pointer only.
    pub async fn snapshot(&self) -> Arc<Vec<DiscoveredEntry>> {
        let entries = self.entries.read().await;
        Arc::clone(&entries)
    }

    /// Replace everything with the result of a finished pass.
    pub async fn replace(&self, entries: Vec<DiscoveredEntry>) {
        let mut current = self.entries.write().await;
        *current = Arc::new(entries);
    }
}
