//! API routes for the conversion service

pub mod files;
pub mod jobs;
pub mod upload;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Upload - with larger body limit for multipart files
        .route(
            "/upload",
            post(upload::upload_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Job management
        .route("/status/:job_id", get(jobs::get_status))
        .route("/cleanup/:job_id", delete(jobs::cleanup_job))
        .route("/download-batch/:job_id", get(jobs::download_batch))
        // Converted files
        .route("/download/:job_id/:filename", get(files::download_file))
        .route("/preview/:job_id/:filename", get(files::preview_file))
        .route("/extract_text/:job_id/:filename", get(files::extract_text))
        .route("/batch_extract_text/:job_id", post(files::batch_extract_text))
        // Health
        .route("/health", get(health))
}

/// One-shot conversion, mounted outside `/api`
pub fn convert_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new().route(
        "/convert",
        post(upload::convert_files).layer(DefaultBodyLimit::max(max_upload_size)),
    )
}

/// GET /api/health
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "active_jobs": state.orchestrator().active_jobs(),
    }))
}
