//! Converted file access and on-demand text extraction

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::TextStatus;

/// Response for text extraction
#[derive(Debug, Serialize)]
pub struct ExtractTextResponse {
    pub job_id: Uuid,
    pub filename: String,
    pub text_file: PathBuf,
    pub text: String,
}

/// GET /api/download/:job_id/:filename - HTML output as an attachment
pub async fn download_file(
    State(state): State<AppState>,
    Path((job_id, filename)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse> {
    serve_html(&state, job_id, &filename, "attachment").await
}

/// GET /api/preview/:job_id/:filename - HTML output inline
pub async fn preview_file(
    State(state): State<AppState>,
    Path((job_id, filename)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse> {
    serve_html(&state, job_id, &filename, "inline").await
}

async fn serve_html(
    state: &AppState,
    job_id: Uuid,
    filename: &str,
    disposition: &str,
) -> Result<impl IntoResponse> {
    let path = state.store().resolve_output(job_id, filename)?;
    let data = tokio::fs::read(&path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("{}; filename=\"{}\"", disposition, filename),
            ),
        ],
        data,
    ))
}

/// GET /api/extract_text/:job_id/:filename - Plain text of an uploaded file
pub async fn extract_text(
    State(state): State<AppState>,
    Path((job_id, filename)): Path<(Uuid, String)>,
) -> Result<Json<ExtractTextResponse>> {
    let input = state.store().resolve_upload(job_id, &filename)?;
    let output_dir = state.store().output_dir(job_id);
    let extractor = state.text_extractor();

    let extracted = tokio::task::spawn_blocking(move || extractor.extract_to(&input, &output_dir))
        .await
        .map_err(|e| Error::Internal(format!("Text extraction task failed: {}", e)))?;

    match extracted {
        Ok((text_file, text)) => Ok(Json(ExtractTextResponse {
            job_id,
            filename,
            text_file,
            text,
        })),
        Err(message) => {
            tracing::warn!("[{}] Text extraction failed for {}: {}", job_id, filename, message);
            Err(Error::exhausted(filename, message))
        }
    }
}

/// Outcome of extracting one upload in a batch
#[derive(Debug, Serialize)]
pub struct TextFileResult {
    pub filename: String,
    pub status: TextStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for batch text extraction
#[derive(Debug, Serialize)]
pub struct BatchExtractResponse {
    pub job_id: Uuid,
    pub results: Vec<TextFileResult>,
}

/// POST /api/batch_extract_text/:job_id - Text of every upload in a job
pub async fn batch_extract_text(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<BatchExtractResponse>> {
    let uploads = state.store().list_uploads(job_id)?;
    let output_dir = state.store().output_dir(job_id);
    let extractor = state.text_extractor();

    let results = tokio::task::spawn_blocking(move || {
        uploads
            .iter()
            .map(|input| {
                let filename = input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match extractor.extract_to(input, &output_dir) {
                    Ok((text_file, _)) => TextFileResult {
                        filename,
                        status: TextStatus::Success,
                        text_file: Some(text_file),
                        error: None,
                    },
                    Err(error) => TextFileResult {
                        filename,
                        status: TextStatus::Failed,
                        text_file: None,
                        error: Some(error),
                    },
                }
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| Error::Internal(format!("Text extraction task failed: {}", e)))?;

    tracing::info!(
        "[{}] Batch text extraction: {}/{} succeeded",
        job_id,
        results.iter().filter(|r| r.status == TextStatus::Success).count(),
        results.len()
    );

    Ok(Json(BatchExtractResponse { job_id, results }))
}
