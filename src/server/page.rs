//! Form page and health endpoint.

use axum::response::Html;
use axum::Json;
use serde_json::{json, Value};

const INDEX_HTML: &str = include_str!("index.html");

/// The download form.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Heartbeat endpoint.
///
/// Returns `{"status": "ok", "version": "..."}` with HTTP 200.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status":  "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
