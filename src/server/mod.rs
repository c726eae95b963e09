//! HTTP surface — the Swagger UI landing page and the manual refresh hook.
//!
//! Routes:
//! - `GET /` renders the template with the cached entries as JSON
//! - `GET|POST /refresh` runs a refresh pass before answering 200
//! - anything else is 404

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::borrow::Cow;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::discovery::refresh::Refresher;
use crate::discovery::DiscoveredEntry;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// Replaced with the JSON array of discovered entries.
pub const SERVICES_PLACEHOLDER: &str = "{{ services }}";

/// Where the page template comes from.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    /// The page compiled into the binary.
    Builtin,
    /// A file read on every request, so it can be edited live.
    File(PathBuf),
}

impl TemplateSource {
    async fn load(&self) -> std::io::Result<Cow<'static, str>> {
        match self {
            TemplateSource::Builtin => Ok(Cow::Borrowed(INDEX_TEMPLATE)),
            TemplateSource::File(path) => tokio::fs::read_to_string(path).await.map(Cow::Owned),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    refresher: Arc<Refresher>,
    template: TemplateSource,
}

impl AppState {
    pub fn new(refresher: Arc<Refresher>, template: TemplateSource) -> Self {
        Self { refresher, template }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/refresh", get(refresh).post(refresh))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server started on {} port!", addr.port());

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

/// Substitute the entries into `template`.
///
/// The JSON lands inside a `<script>` block, so `</` is escaped to keep a
/// hostile service name from closing it.
pub fn render(template: &str, entries: &[DiscoveredEntry]) -> serde_json::Result<String> {
    let json = serde_json::to_string(entries)?.replace("</", "<\\/");
    Ok(template.replace(SERVICES_PLACEHOLDER, &json))
}

async fn index(State(state): State<AppState>) -> Response {
    let template = match state.template.load().await {
        Ok(t) => t,
        Err(e) => {
            error!(template = ?state.template, "Page template not loaded: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let entries = state.refresher.cache().snapshot().await;
    match render(&template, &entries) {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            error!("Failed to render page: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn refresh(State(state): State<AppState>) -> StatusCode {
    info!("Manual refresh requested");
    state.refresher.refresh().await;
    StatusCode::OK
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ServiceCache;
    use crate::config::Targets;
    use crate::discovery::resolver::DocPaths;
    use crate::discovery::testing::FakeProber;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::io::Write;
    use tower::ServiceExt;

    fn state(targets: Targets, prober: FakeProber, template: TemplateSource) -> AppState {
        let refresher = Refresher::new(
            targets,
            DocPaths::new(vec!["v2".into(), "v3".into()], None, None),
            Arc::new(prober),
            ServiceCache::new(),
        );
        AppState::new(Arc::new(refresher), template)
    }

    async fn get_path(app: Router, path: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_render_substitutes_entries() {
        let entries = vec![DiscoveredEntry { name: "users".into(), url: "/users/v3/api-docs".into() }];
        let page = render("urls: {{ services }};", &entries).unwrap();
        assert_eq!(page, r#"urls: [{"name":"users","url":"/users/v3/api-docs"}];"#);
    }

    #[test]
    fn test_render_escapes_script_close() {
        let entries = vec![DiscoveredEntry { name: "</script>".into(), url: "/x".into() }];
        let page = render("{{ services }}", &entries).unwrap();
        assert!(!page.contains("</script>"));
        assert!(page.contains(r#"<\/script>"#));
    }

    #[test]
    fn test_builtin_template_has_placeholder() {
        assert!(INDEX_TEMPLATE.contains(SERVICES_PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_index_lists_cached_entries() {
        let state = state(Targets::Services(Vec::new()), FakeProber::default(), TemplateSource::Builtin);
        state
            .refresher
            .cache()
            .replace(vec![DiscoveredEntry { name: "users".into(), url: "/users/v3/api-docs".into() }])
            .await;

        let (status, body) = get_path(router(state), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"{"name":"users","url":"/users/v3/api-docs"}"#));
        assert!(!body.contains(SERVICES_PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let state = state(Targets::Services(Vec::new()), FakeProber::default(), TemplateSource::Builtin);
        let (status, _) = get_path(router(state), "/index.html").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_template_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let template = TemplateSource::File(dir.path().join("missing.html"));
        let state = state(Targets::Services(Vec::new()), FakeProber::default(), template);

        let (status, _) = get_path(router(state), "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_template_file_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<ul data-services='{{{{ services }}}}'></ul>").unwrap();
        let state = state(
            Targets::Services(Vec::new()),
            FakeProber::default(),
            TemplateSource::File(file.path().to_path_buf()),
        );

        let (status, body) = get_path(router(state), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<ul data-services='[]'></ul>");
    }

    #[tokio::test]
    async fn test_refresh_with_no_targets() {
        let state = state(Targets::OpenApiUrls(Vec::new()), FakeProber::default(), TemplateSource::Builtin);
        let refresher = Arc::clone(&state.refresher);

        let (status, _) = get_path(router(state), "/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(refresher.cache().snapshot().await.len(), 0);
    }

    #[tokio::test]
    async fn test_refresh_populates_cache() {
        let prober = FakeProber::reachable(["http://users/v2/api-docs", "http://users/v3/api-docs"]);
        let state = state(Targets::Services(vec!["users".into()]), prober, TemplateSource::Builtin);
        let app = router(state);

        let (status, _) = get_path(app.clone(), "/refresh").await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = get_path(app, "/").await;
        assert!(body.contains(r#"{"name":"users","url":"/users/v3/api-docs"}"#));
    }
}
