//! Discovery — finds which API-doc endpoints are reachable right now.
//!
//! Runs on startup, on the refresh schedule and on `/refresh`. Each pass:
//! - Probes every configured target sequentially
//! - Resolves versioned doc paths for bare service names
//! - Publishes the reachable endpoints to the service cache in one swap

use serde::Serialize;

pub mod poller;
pub mod prober;
pub mod refresh;
pub mod resolver;

/// One reachable API-doc endpoint, as listed on the landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredEntry {
    /// Display name (service name or URL host).
    pub name: String,
    /// Link to the docs: absolute URL or a path behind this ingress.
    pub url: String,
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::prober::Probe;

    /// Answers 200 for a fixed set of URLs and records every call.
    #[derive(Default)]
    pub struct FakeProber {
        reachable: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProber {
        pub fn reachable<I, S>(urls: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                reachable: urls.into_iter().map(Into::into).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Probe for FakeProber {
        async fn probe(&self, url: &str) -> bool {
            self.calls.lock().unwrap().push(url.to_string());
            self.reachable.contains(url)
        }
    }
}
