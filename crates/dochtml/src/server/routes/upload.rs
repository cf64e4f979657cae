//! Multipart uploads: asynchronous jobs and one-shot conversion

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{ConversionResult, FileDescriptor, FormatDetector, Settings};

/// Response from upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: Uuid,
    pub status: String,
    pub total_files: usize,
    pub total_size: u64,
}

/// Response from one-shot conversion
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub job_id: Uuid,
    pub success: usize,
    pub failed: usize,
    pub results: Vec<ConversionResult>,
}

/// Stored files plus the plain form fields that came with them
struct ReceivedUpload {
    files: Vec<FileDescriptor>,
    fields: HashMap<String, String>,
    total_size: u64,
}

/// POST /api/upload - Store files and start a conversion job
pub async fn upload_files(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let job_id = Uuid::new_v4();
    let upload = receive_files(&state, job_id, multipart).await?;

    // Unreadable settings fall back to the defaults
    let settings = match upload.fields.get("settings").filter(|raw| !raw.trim().is_empty()) {
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!("[{}] Ignoring invalid settings: {}", job_id, e);
            Settings::default()
        }),
        None => Settings::default(),
    };

    let total_files = upload.files.len();
    state
        .orchestrator()
        .submit_job_with_id(job_id, upload.files, settings);

    Ok(Json(UploadResponse {
        job_id,
        status: "started".to_string(),
        total_files,
        total_size: upload.total_size,
    }))
}

/// POST /convert - Convert the uploaded files before responding
pub async fn convert_files(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ConvertResponse>> {
    let job_id = Uuid::new_v4();
    let upload = receive_files(&state, job_id, multipart).await?;
    let settings = Settings::from_form(&upload.fields);

    let snapshot = state
        .orchestrator()
        .run_job(job_id, upload.files, settings)
        .await;

    Ok(Json(ConvertResponse {
        job_id,
        success: snapshot.completed_files,
        failed: snapshot.failed_files,
        results: snapshot.results,
    }))
}

/// Store every allowed `files` part under `job_id`. Disallowed extensions
/// are skipped; size violations remove everything stored so far.
async fn receive_files(
    state: &AppState,
    job_id: Uuid,
    mut multipart: Multipart,
) -> Result<ReceivedUpload> {
    let max_file_size = state.config().server.max_file_size;
    let max_upload_size = state.config().server.max_upload_size as u64;

    let mut upload = ReceivedUpload {
        files: Vec::new(),
        fields: HashMap::new(),
        total_size: 0,
    };
    let mut saw_file = false;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        state.store().remove_job(job_id);
        Error::InvalidRequest(format!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name != "files" {
            match field.text().await {
                Ok(value) => {
                    upload.fields.insert(name, value);
                }
                Err(e) => tracing::warn!("[{}] Unreadable form field {}: {}", job_id, name, e),
            }
            continue;
        }

        let Some(filename) = field.file_name().map(|s| s.to_string()).filter(|s| !s.is_empty()) else {
            continue;
        };
        saw_file = true;

        if !FormatDetector::is_allowed(&filename) {
            tracing::warn!("[{}] Skipping disallowed upload: {}", job_id, filename);
            continue;
        }

        let data = field.bytes().await.map_err(|e| {
            state.store().remove_job(job_id);
            Error::InvalidRequest(format!("Failed to read file {}: {}", filename, e))
        })?;

        if data.len() > max_file_size {
            state.store().remove_job(job_id);
            return Err(Error::InvalidRequest(format!(
                "File {} exceeds the {} byte limit",
                filename, max_file_size
            )));
        }
        upload.total_size += data.len() as u64;
        if upload.total_size > max_upload_size {
            state.store().remove_job(job_id);
            return Err(Error::InvalidRequest(format!(
                "Upload exceeds the {} byte limit",
                max_upload_size
            )));
        }

        let path = match state.store().save_upload(job_id, &filename, &data) {
            Ok(path) => path,
            Err(Error::InvalidRequest(reason)) => {
                tracing::warn!("[{}] {}", job_id, reason);
                continue;
            }
            Err(e) => {
                state.store().remove_job(job_id);
                return Err(e);
            }
        };
        let stored_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.clone());

        tracing::info!("[{}] Stored upload: {} ({} bytes)", job_id, stored_name, data.len());
        upload
            .files
            .push(FileDescriptor::new(stored_name, path, data.len() as u64));
    }

    if !saw_file {
        return Err(Error::InvalidRequest("No files selected".to_string()));
    }
    if upload.files.is_empty() {
        state.store().remove_job(job_id);
        return Err(Error::InvalidRequest("No valid files uploaded".to_string()));
    }

    Ok(upload)
}
