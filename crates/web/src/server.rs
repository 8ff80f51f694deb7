//! Web server implementation

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use streamlens_common::{ingest, DashboardStats, Error as CommonError};

use crate::static_files::{StaticFiles, INDEX_HTML};

/// Web server configuration
#[derive(Clone, Debug, Default)]
pub struct WebServerConfig {
    /// Serve UI assets from this directory instead of the embedded copies
    pub static_dir: Option<PathBuf>,

    /// Render with animations disabled so screenshots are pixel-stable
    pub test_mode: bool,
}

impl WebServerConfig {
    pub fn from_env() -> Self {
        let static_dir = std::env::var("STREAMLENS_WEB_STATIC_DIR")
            .ok()
            .and_then(|v| {
                let v = v.trim().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(v))
                }
            });

        let test_mode = std::env::var("STREAMLENS_E2E_TEST_MODE")
            .map(|v| v == "1")
            .unwrap_or(false);

        Self {
            static_dir,
            test_mode,
        }
    }
}

/// Web server state
#[derive(Clone)]
pub struct WebServer {
    state: Arc<WebServerState>,
}

struct WebServerState {
    static_files: StaticFiles,
    cfg: WebServerConfig,
}

impl WebServer {
    pub fn new(cfg: WebServerConfig) -> Self {
        Self {
            state: Arc::new(WebServerState {
                static_files: StaticFiles::new(),
                cfg,
            }),
        }
    }

    /// Build the application router.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(health))
            .route("/", get(index))
            .route("/assets/*path", get(asset))
            .route("/api/analyze", post(analyze))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(self.clone())
    }
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, cfg: WebServerConfig) -> anyhow::Result<()> {
    let server = WebServer::new(cfg);
    let app = server.router();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "StreamLens dashboard listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    test_mode: bool,
}

async fn health(State(server): State<WebServer>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: streamlens_common::VERSION,
        test_mode: server.state.cfg.test_mode,
    })
}

async fn index(State(server): State<WebServer>) -> Html<String> {
    let page = if server.state.cfg.test_mode {
        INDEX_HTML.replacen("<body>", r#"<body class="test-mode">"#, 1)
    } else {
        INDEX_HTML.to_string()
    };
    Html(page)
}

async fn asset(
    State(server): State<WebServer>,
    AxumPath(path): AxumPath<String>,
) -> Response {
    // Disk override for UI development; embedded assets otherwise
    if let Some(dir) = &server.state.cfg.static_dir {
        // Reject anything that could escape the override directory
        if !path.split('/').any(|seg| seg == "..") {
            let file = dir.join(&path);
            match std::fs::read(&file) {
                Ok(bytes) => {
                    let mime = mime_guess::from_path(&file).first_or_octet_stream();
                    return (
                        StatusCode::OK,
                        [(header::CONTENT_TYPE, mime.to_string())],
                        bytes,
                    )
                        .into_response();
                }
                Err(e) => {
                    warn!("Static override miss for {}: {}", file.display(), e);
                }
            }
        }
    }

    server.state.static_files.serve(&path)
}

async fn analyze(
    State(_server): State<WebServer>,
    body: String,
) -> Result<Json<DashboardStats>, ApiError> {
    let records = ingest::parse_export(&body)?;
    if records.is_empty() {
        return Err(ApiError::Common(CommonError::NoRecords));
    }

    info!("Analyzing {} record(s)", records.len());
    Ok(Json(DashboardStats::from_records(&records)))
}

/// API error envelope
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Common(#[from] CommonError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Common(CommonError::Serialization(_))
            | ApiError::Common(CommonError::NotAnExport(_))
            | ApiError::Common(CommonError::NoRecords) => StatusCode::BAD_REQUEST,
            ApiError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_server(test_mode: bool) -> WebServer {
        WebServer::new(WebServerConfig {
            static_dir: None,
            test_mode,
        })
    }

    #[tokio::test]
    async fn analyze_returns_stats() {
        let body = r#"[
            {"endTime": "2021-03-01 22:15", "msPlayed": 60000,
             "artistName": "Autechre", "trackName": "Bike"},
            {"endTime": "2021-03-02 09:00", "msPlayed": 120000,
             "artistName": "Autechre", "trackName": "Bike"}
        ]"#;

        let Json(stats) = analyze(State(test_server(false)), body.to_string())
            .await
            .unwrap();

        assert_eq!(stats.summary.total_plays, 2);
        assert_eq!(stats.summary.unique_artists, 1);
        assert_eq!(stats.top_tracks[0].name, "Bike — Autechre");
    }

    #[tokio::test]
    async fn analyze_rejects_malformed_json() {
        let err = analyze(State(test_server(false)), "{not json".to_string())
            .await
            .unwrap_err();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analyze_rejects_empty_export() {
        let err = analyze(State(test_server(false)), "[]".to_string())
            .await
            .unwrap_err();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn index_marks_test_mode() {
        let Html(page) = index(State(test_server(true))).await;
        assert!(page.contains(r#"<body class="test-mode">"#));

        let Html(page) = index(State(test_server(false))).await;
        assert!(!page.contains("test-mode"));
    }

    #[tokio::test]
    async fn asset_prefers_disk_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "// override").unwrap();

        let server = WebServer::new(WebServerConfig {
            static_dir: Some(dir.path().to_path_buf()),
            test_mode: false,
        });

        let resp = asset(State(server), AxumPath("app.js".to_string())).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn asset_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secret.txt"), "hidden").unwrap();
        let static_dir = dir.path().join("static");
        std::fs::create_dir(&static_dir).unwrap();

        let server = WebServer::new(WebServerConfig {
            static_dir: Some(static_dir),
            test_mode: false,
        });

        let resp = asset(State(server), AxumPath("../secret.txt".to_string())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_version() {
        let Json(resp) = health(State(test_server(false))).await;
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.version, streamlens_common::VERSION);
    }
}
