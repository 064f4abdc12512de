use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use crate::{error::UPLOAD_PROMPT, AppState};

pub mod sheets;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_file_size + MULTIPART_OVERHEAD;

    Router::new()
        .merge(routes())
        .merge(sheets::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
}

async fn index() -> Json<Value> {
    Json(json!({ "info": UPLOAD_PROMPT }))
}

async fn health_check() -> &'static str {
    "OK"
}
