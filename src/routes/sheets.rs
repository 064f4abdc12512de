use axum::{
    extract::{Multipart, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use crate::{
    AppState,
    error::AppError,
    models::{ColumnAnalysis, DashboardView, ExplorerView, SessionOverview},
    services::excel::{utils::has_supported_extension, ColumnSummarizer, LoadedSheet},
};
use tower_http::cors::{Any, CorsLayer};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/sessions", post(create_session))
        .route(
            "/sessions/:id",
            get(get_session).put(replace_session).delete(delete_session),
        )
        .route("/sessions/:id/explorer", get(explorer))
        .route("/sessions/:id/dashboard", get(dashboard))
        .route("/sessions/:id/columns/:column", get(analyze_column))
        .layer(cors)
}

#[derive(Debug)]
struct Upload {
    file_name: Option<String>,
    data: Bytes,
    sheet: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnQuery {
    top_n: Option<usize>,
}

/// Reads the `file` part (and optional `sheet` part) of a multipart upload.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let mut upload = Upload {
        file_name: None,
        data: Bytes::new(),
        sheet: None,
    };

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(|name| name.to_string());
        match name.as_deref() {
            Some("file") => {
                upload.file_name = field.file_name().map(|name| name.to_string());
                upload.data = field.bytes().await?;
            }
            Some("sheet") => {
                let sheet = field.text().await?;
                let sheet = sheet.trim();
                if !sheet.is_empty() {
                    upload.sheet = Some(sheet.to_string());
                }
            }
            other => tracing::debug!("Ignoring multipart field {:?}", other),
        }
    }

    if upload.data.is_empty() {
        return Err(AppError::MissingUpload);
    }
    if let Some(name) = &upload.file_name {
        if !has_supported_extension(name) {
            tracing::error!("Unsupported file type: {}", name);
            return Err(AppError::InvalidInput(
                "Only Excel files (xlsx, xlsm, xlsb, xls, ods) are supported".to_string(),
            ));
        }
    }

    tracing::info!(
        "Received upload {:?}, size: {}KB",
        upload.file_name,
        upload.data.len() / 1024
    );
    Ok(upload)
}

fn load_upload(state: &AppState, upload: Upload) -> Result<(Option<String>, LoadedSheet), AppError> {
    let loaded = state.loader.load(upload.data, upload.sheet.as_deref())?;
    Ok((upload.file_name, loaded))
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SessionOverview>), AppError> {
    let upload = read_upload(multipart).await?;
    let (file_name, loaded) = load_upload(&state, upload)?;
    let session = state.sessions.create(file_name, loaded);
    tracing::info!("Created session {}", session.id);

    Ok((StatusCode::CREATED, Json(SessionOverview::from_session(&session))))
}

async fn replace_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<SessionOverview>, AppError> {
    // Fail fast before parsing a workbook nobody can see.
    state.sessions.get(&id)?;
    let upload = read_upload(multipart).await?;
    let (file_name, loaded) = load_upload(&state, upload)?;
    let session = state.sessions.replace(&id, file_name, loaded)?;
    tracing::info!("Replaced table of session {}", session.id);

    Ok(Json(SessionOverview::from_session(&session)))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(&id)?;
    tracing::info!("Ended session {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionOverview>, AppError> {
    let session = state.sessions.get(&id)?;
    Ok(Json(SessionOverview::from_session(&session)))
}

async fn explorer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ExplorerView>, AppError> {
    let session = state.sessions.get(&id)?;
    let view = ExplorerView::build(&session.table, state.config.preview_rows)?;
    Ok(Json(view))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DashboardView>, AppError> {
    let session = state.sessions.get(&id)?;
    let view = DashboardView::build(&session.table, state.config.preview_rows)?;
    Ok(Json(view))
}

async fn analyze_column(
    State(state): State<Arc<AppState>>,
    Path((id, column)): Path<(String, String)>,
    Query(query): Query<ColumnQuery>,
) -> Result<Json<ColumnAnalysis>, AppError> {
    let session = state.sessions.get(&id)?;
    let summary = ColumnSummarizer.summarize(&session.table, &column, query.top_n)?;
    Ok(Json(ColumnAnalysis { column, summary }))
}
