//! Start-up configuration — command-line flags with environment fallbacks.
//!
//! The ingress deployment only ever sets environment variables, so every
//! flag mirrors the variable of the same name. Values are read once and
//! validated into [`Config`]; any error here is fatal (exit code 2).

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::schedule::{Schedule, ScheduleError};

/// Version labels probed when `VERSIONS` is not set.
pub const DEFAULT_VERSIONS: [&str; 2] = ["v2", "v3"];

/// Refresh schedule used when `REFRESH_CRON` is not set.
pub const DEFAULT_REFRESH_CRON: &str = "@every 1m";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Service names to probe, e.g. `["users","billing"]` (deprecated, prefer OPENAPI_URLS)
    #[arg(long, env = "SERVICES")]
    pub services: Option<String>,
    /// Fully-qualified API-doc URLs, e.g. `["https://api.example.com/v3/api-docs"]`
    #[arg(long, env = "OPENAPI_URLS")]
    pub openapi_urls: Option<String>,
    /// Version path segments tried for every service
    #[arg(long, env = "VERSIONS")]
    pub versions: Option<String>,
    /// Suffix appended to `api-docs`, e.g. `json`
    #[arg(long, env = "APIDOCS_EXTENSION")]
    pub apidocs_extension: Option<String>,
    /// Single schema path probed instead of the version list
    #[arg(long, env = "API_SCHEMA_URL")]
    pub api_schema_url: Option<String>,
    /// `@every <duration>` (whole seconds, at least 1s), a `@daily`-style descriptor or a cron expression
    #[arg(long, env = "REFRESH_CRON", default_value = DEFAULT_REFRESH_CRON)]
    pub refresh_cron: String,
    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,
    /// Seconds before an API-doc request is abandoned
    #[arg(long, env = "PROBE_TIMEOUT_SECS", default_value_t = 10)]
    pub probe_timeout_secs: u64,
    /// HTML template overriding the built-in Swagger UI page
    #[arg(long, env = "TEMPLATE_PATH")]
    pub template_path: Option<PathBuf>,
    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variables \"SERVICES\" and \"OPENAPI_URLS\" are both empty")]
    NoTargets,
    #[error("\"VERSIONS\" must list at least one version")]
    NoVersions,
    #[error("invalid \"REFRESH_CRON\" {expr:?}: {source}")]
    Schedule {
        expr: String,
        #[source]
        source: ScheduleError,
    },
    #[error("\"PROBE_TIMEOUT_SECS\" must be greater than zero")]
    ZeroTimeout,
}

impl ConfigError {
    /// Process exit code for a configuration failure.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// What a refresh pass walks over. Picked once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    /// Bare service names; version and extension are appended per probe.
    Services(Vec<String>),
    /// Complete API-doc URLs, probed as-is.
    OpenApiUrls(Vec<String>),
}

impl Targets {
    pub fn len(&self) -> usize {
        match self {
            Targets::Services(items) | Targets::OpenApiUrls(items) => items.len(),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub targets: Targets,
    pub versions: Vec<String>,
    /// Extension including its leading dot (`.json`).
    pub extension: Option<String>,
    /// Schema path without a leading slash.
    pub schema_path: Option<String>,
    pub schedule: Schedule,
    pub port: u16,
    pub probe_timeout: Duration,
    pub template_path: Option<PathBuf>,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let services = non_empty(args.services.as_deref()).map(parse_list).unwrap_or_default();
        let urls = non_empty(args.openapi_urls.as_deref()).map(parse_list).unwrap_or_default();

        let targets = if !urls.is_empty() {
            if !services.is_empty() {
                warn!("Both SERVICES and OPENAPI_URLS are set — ignoring SERVICES");
            }
            Targets::OpenApiUrls(urls)
        } else if !services.is_empty() {
            let mut services = services;
            services.sort();
            Targets::Services(services)
        } else {
            return Err(ConfigError::NoTargets);
        };

        let versions = match non_empty(args.versions.as_deref()) {
            Some(raw) => {
                let versions = parse_list(raw);
                if versions.is_empty() {
                    return Err(ConfigError::NoVersions);
                }
                versions
            }
            None => DEFAULT_VERSIONS.iter().map(|v| v.to_string()).collect(),
        };

        let extension = non_empty(args.apidocs_extension.as_deref())
            .map(|ext| ext.trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{}", ext));

        let schema_path = non_empty(args.api_schema_url.as_deref())
            .map(|path| path.trim_start_matches('/'))
            .filter(|path| !path.is_empty())
            .map(str::to_string);

        let expr = non_empty(Some(args.refresh_cron.as_str())).unwrap_or(DEFAULT_REFRESH_CRON);
        let schedule = expr.parse::<Schedule>().map_err(|source| ConfigError::Schedule {
            expr: expr.to_string(),
            source,
        })?;

        if args.probe_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(Self {
            targets,
            versions,
            extension,
            schema_path,
            schedule,
            port: args.port,
            probe_timeout: Duration::from_secs(args.probe_timeout_secs),
            template_path: args.template_path,
        })
    }

    /// Start-up banner describing what will be discovered.
    pub fn log_summary(&self) {
        match &self.targets {
            Targets::OpenApiUrls(urls) => info!("OpenApi URLs: {:?}", urls),
            Targets::Services(services) => {
                info!("Services: {:?}", services);
                match &self.schema_path {
                    Some(path) => info!("Discovering schema path: /{}", path),
                    None => info!(
                        "Discovering versions: {:?} with extension {:?}",
                        self.versions,
                        self.extension.as_deref().unwrap_or("")
                    ),
                }
            }
        }
        info!(schedule = %self.schedule, "Refresh schedule");
    }
}

/// Parse a list value such as `["a","b"]`.
///
/// JSON arrays are taken as-is. Anything else is split on commas after
/// dropping an optional surrounding bracket pair, with each item trimmed
/// and unquoted (`'a', "b", c` all work). Empty items are skipped.
pub fn parse_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if let Ok(items) = serde_json::from_str::<Vec<String>>(raw) {
        return items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
    }

    let inner = raw.strip_prefix('[').unwrap_or(raw);
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    inner
        .split(',')
        .map(|item| unquote(item.trim()).trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn unquote(item: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = item.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    item
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
