//! Job and per-file result records

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::conversion::StrategyAttempt;

/// Job status. Transitions only move forward:
/// pending -> processing -> completed | failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Failed)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

/// Outcome of one input file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Success,
    Failed,
    Skipped,
}

/// Outcome of the text extraction for one file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TextStatus {
    Success,
    Failed,
}

/// An uploaded file queued for conversion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Sanitized file name
    pub filename: String,
    /// Where the upload is stored
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

impl FileDescriptor {
    pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            filename: filename.into(),
            path: path.into(),
            size,
        }
    }

    /// File name without its extension
    pub fn stem(&self) -> String {
        std::path::Path::new(&self.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.filename.clone())
    }
}

/// Per-file result, appended in input order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversionResult {
    pub original_filename: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_status: Option<TextStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Cascade stage that produced the HTML
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<StrategyAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionResult {
    pub fn new(filename: impl Into<String>, status: FileStatus) -> Self {
        Self {
            original_filename: filename.into(),
            status,
            output_path: None,
            download_url: None,
            preview_url: None,
            text_file: None,
            text_status: None,
            html_size: None,
            file_size: None,
            method: None,
            attempts: Vec::new(),
            error: None,
        }
    }

    pub fn failed(filename: impl Into<String>, error: impl Into<String>) -> Self {
        let mut result = Self::new(filename, FileStatus::Failed);
        result.error = Some(error.into());
        result
    }

    pub fn skipped(filename: impl Into<String>, reason: Option<String>) -> Self {
        let mut result = Self::new(filename, FileStatus::Skipped);
        result.error = reason;
        result
    }
}

/// Read-only view of a job handed to pollers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: f64,
    pub total_files: usize,
    pub completed_files: usize,
    pub failed_files: usize,
    pub results: Vec<ConversionResult>,
    pub error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_are_one_directional() {
        assert!(JobStatus::Pending.can_advance_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_advance_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_advance_to(JobStatus::Failed));
        assert!(!JobStatus::Processing.can_advance_to(JobStatus::Pending));
        assert!(!JobStatus::Completed.can_advance_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_advance_to(JobStatus::Processing));
        assert!(!JobStatus::Pending.can_advance_to(JobStatus::Completed));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&JobStatus::Completed).unwrap(), "\"completed\"");
        assert_eq!(serde_json::to_string(&FileStatus::Skipped).unwrap(), "\"skipped\"");
    }

    #[test]
    fn test_result_omits_empty_fields() {
        let result = ConversionResult::failed("cv.pdf", "boom");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert!(json.get("output_path").is_none());
        assert!(json.get("attempts").is_none());
    }

    #[test]
    fn test_descriptor_stem() {
        let file = FileDescriptor::new("resume.final.docx", "/tmp/x", 10);
        assert_eq!(file.stem(), "resume.final");
    }
}
