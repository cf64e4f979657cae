//! Single-document conversion shared by jobs, batch runs and the CLI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use crate::conversion::{panic_message, HtmlConverter, StrategyAttempt};
use crate::output::HtmlAssembler;
use crate::types::{FileStatus, Settings};

/// Outcome of converting one document to HTML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub filename: String,
    pub input_path: PathBuf,
    pub timestamp: DateTime<Utc>,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<StrategyAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentReport {
    fn failed(path: &Path, error: String) -> Self {
        Self {
            filename: file_name(path),
            input_path: path.to_path_buf(),
            timestamp: Utc::now(),
            status: FileStatus::Failed,
            output_path: None,
            html_size: None,
            file_size: std::fs::metadata(path).map(|m| m.len()).ok(),
            method: None,
            attempts: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FileStatus::Success
    }
}

/// Convert `path` to `<output_dir>/<stem>.html` plus its metadata sidecar.
/// Never fails: conversion errors, assembly errors and panics all end up in
/// a `failed` report.
pub fn convert_document(
    converter: &HtmlConverter,
    path: &Path,
    settings: &Settings,
    output_dir: &Path,
) -> DocumentReport {
    let filename = file_name(path);
    tracing::info!("[{}] Converting to HTML", filename);

    let run = || {
        let converted = converter.convert(path, settings)?;
        let metadata =
            HtmlAssembler::new().write(path, &converted.content, Some(&converted.method), output_dir)?;
        Ok::<_, crate::error::Error>((converted, metadata))
    };

    match catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok((converted, metadata))) => DocumentReport {
            filename,
            input_path: metadata.input_path,
            timestamp: metadata.timestamp,
            status: FileStatus::Success,
            output_path: Some(metadata.output_path),
            html_size: Some(metadata.html_size),
            file_size: Some(metadata.file_size),
            method: Some(converted.method),
            attempts: converted.attempts,
            error: None,
        },
        Ok(Err(e)) => {
            tracing::error!("[{}] HTML conversion failed: {}", filename, e);
            DocumentReport::failed(path, e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!("[{}] HTML conversion panicked: {}", filename, message);
            DocumentReport::failed(path, format!("Conversion panicked: {}", message))
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
