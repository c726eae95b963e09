//! HTTP prober — is this API-doc URL answering 200 right now?

use anyhow::{Context, Result};
use async_trait::async_trait;
use http::StatusCode;
use std::time::Duration;
use tracing::{info, warn};

/// Reachability check for a single URL.
///
/// Failures never propagate: a network error, a timeout and a non-200
/// status all read as "not reachable".
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str) -> bool;
}

pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("autoswagger/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn probe(&self, url: &str) -> bool {
        info!(url = %url, "Trying url");
        match self.client.get(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                info!(url = %url, status = %status, "Probe answered");
                // Body is dropped unread; only the status matters.
                status == StatusCode::OK
            }
            Err(e) => {
                warn!(url = %url, "Probe failed: {}", e);
                false
            }
        }
    }
}
