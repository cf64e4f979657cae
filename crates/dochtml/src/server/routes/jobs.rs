//! Job status, cleanup and archive endpoints

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{JobSnapshot, JobStatus};

/// GET /api/status/:job_id - Job snapshot
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobSnapshot>> {
    state.orchestrator().get_job_status(job_id).map(Json)
}

/// DELETE /api/cleanup/:job_id - Remove a job and its files
pub async fn cleanup_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let orchestrator = state.orchestrator().clone();
    tokio::task::spawn_blocking(move || orchestrator.delete_job(job_id))
        .await
        .map_err(|e| Error::Internal(format!("Cleanup task failed: {}", e)))?;

    Ok(Json(json!({ "status": "cleaned" })))
}

/// GET /api/download-batch/:job_id - Zip of every successful HTML output
pub async fn download_batch(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state
        .orchestrator()
        .get_job(job_id)
        .ok_or_else(|| Error::not_found(format!("Job {} not found", job_id)))?;

    if job.status() != JobStatus::Completed {
        return Err(Error::InvalidRequest("Job not completed".to_string()));
    }

    let outputs = job.successful_outputs();
    let store = state.store().clone();
    let zip_path = tokio::task::spawn_blocking(move || store.bundle_outputs(job_id, &outputs))
        .await
        .map_err(|e| Error::Internal(format!("Archive task failed: {}", e)))??;

    let data = tokio::fs::read(&zip_path).await?;
    let disposition = format!("attachment; filename=\"{}_converted_files.zip\"", job_id);

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    ))
}
