//! HTTP front-end.
//!
//! Routes:
//! - `GET /` the download form
//! - `POST /download` look up, download and stream a file
//! - `GET /health` heartbeat

pub mod download;
pub mod error;
pub mod page;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::extractors::{DownloadOptions, MediaExtractor};

/// State shared by every request. Read-only once the server is running.
pub struct AppState {
    pub extractor: Arc<dyn MediaExtractor>,
    pub options: DownloadOptions,
    pub temp_dir: PathBuf,
    pub file_prefix: String,
    pub keep_files: bool,
}

impl AppState {
    pub fn new(config: &Config, extractor: Arc<dyn MediaExtractor>) -> Self {
        Self {
            extractor,
            options: config.download_options(),
            temp_dir: config.temp_dir(),
            file_prefix: config.app.file_prefix.clone(),
            keep_files: config.app.keep_files,
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(page::index))
        .route("/health", get(page::health))
        .route("/download", post(download::download))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.server.bind_address` and serve until Ctrl-C or SIGTERM
pub async fn serve(config: &Config, state: Arc<AppState>) -> Result<()> {
    let addr = config.bind_address()?;

    tokio::fs::create_dir_all(&state.temp_dir)
        .await
        .with_context(|| format!("Failed to create temp dir {}", state.temp_dir.display()))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, temp_dir = %state.temp_dir.display(), "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::ytdlp::YtDlpExtractor;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Config::default();
        router(Arc::new(AppState::new(&config, Arc::new(YtDlpExtractor::default()))))
    }

    #[tokio::test]
    async fn index_is_html() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("<form"));
    }

    #[tokio::test]
    async fn health_is_json() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn download_requires_post() {
        let response = app()
            .oneshot(Request::get("/download").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn state_follows_config() {
        let mut config = Config::default();
        config.app.keep_files = true;
        config.app.temp_dir = Some(PathBuf::from("/var/tmp/ytgrab"));
        config.extractor.audio_quality = "128K".to_string();

        let state = AppState::new(&config, Arc::new(YtDlpExtractor::default()));
        assert!(state.keep_files);
        assert_eq!(state.temp_dir, PathBuf::from("/var/tmp/ytgrab"));
        assert_eq!(state.options.audio_quality, "128K");
        assert_eq!(state.extractor.name(), "yt-dlp");
    }
}
