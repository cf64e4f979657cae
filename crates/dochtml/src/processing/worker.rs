//! Per-job worker task

use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::job::JobWriter;
use super::pipeline::convert_document;
use crate::conversion::{panic_message, HtmlConverter, TextExtractor};
use crate::error::{Error, Result};
use crate::output::AssetStore;
use crate::types::{
    ConversionResult, FileDescriptor, FileStatus, FormatDetector, Settings, TextStatus,
};

/// Converts the files of one job, strictly in order
#[derive(Clone)]
pub struct JobWorker {
    converter: HtmlConverter,
    store: AssetStore,
}

impl JobWorker {
    pub fn new(converter: HtmlConverter, store: AssetStore) -> Self {
        Self { converter, store }
    }

    /// Drive a job from pending to a terminal state
    pub async fn run(self, writer: JobWriter) {
        let job = writer.job().clone();
        tracing::info!("[{}] Starting job with {} files", job.id, job.files.len());
        writer.start();

        match self.process_files(&writer).await {
            Ok(()) => {
                writer.complete();
                let snapshot = job.snapshot();
                tracing::info!(
                    "[{}] Job completed: {} succeeded, {} failed of {}",
                    job.id,
                    snapshot.completed_files,
                    snapshot.failed_files,
                    snapshot.total_files
                );
            }
            Err(e) => {
                tracing::error!("[{}] Job failed: {}", job.id, e);
                writer.fail(e.to_string());
            }
        }
    }

    async fn process_files(&self, writer: &JobWriter) -> Result<()> {
        let job = writer.job().clone();
        let output_dir = self.store.output_dir(job.id);
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| Error::JobFailure(format!("Failed to create output directory: {}", e)))?;

        for (index, file) in job.files.iter().enumerate() {
            tracing::info!("[{}] File {}/{}: {}", job.id, index + 1, job.files.len(), file.filename);

            let worker = self.clone();
            let descriptor = file.clone();
            let settings = job.settings.clone();
            let out = output_dir.clone();
            let job_id = job.id;

            // Conversions block on file IO and external processes
            let result = match tokio::task::spawn_blocking(move || {
                worker.process_file(job_id, &descriptor, &settings, &out)
            })
            .await
            {
                Ok(result) => result,
                Err(e) if e.is_panic() => {
                    let message = panic_message(e.into_panic().as_ref());
                    tracing::error!("[{}] {} panicked: {}", job.id, file.filename, message);
                    ConversionResult::failed(&file.filename, format!("Conversion panicked: {}", message))
                }
                Err(e) => {
                    return Err(Error::JobFailure(format!("Worker task cancelled: {}", e)));
                }
            };

            writer.record_result(result);
        }

        Ok(())
    }

    /// Convert one file. Failures end up in the returned result.
    pub fn process_file(
        &self,
        job_id: Uuid,
        file: &FileDescriptor,
        settings: &Settings,
        output_dir: &Path,
    ) -> ConversionResult {
        if settings.produces_nothing() {
            if let Err(e) = std::fs::remove_file(&file.path) {
                tracing::debug!("[{}] Could not discard {}: {}", job_id, file.filename, e);
            }
            return ConversionResult::skipped(&file.filename, Some("No output requested".to_string()));
        }

        if let Err(e) = FormatDetector::detect(&file.path) {
            tracing::warn!("[{}] {}: {}", job_id, file.filename, e);
            return ConversionResult::failed(&file.filename, e.to_string());
        }

        let mut result = ConversionResult::new(&file.filename, FileStatus::Failed);
        result.file_size = Some(file.size);
        let mut errors = Vec::new();
        let mut succeeded = false;

        if settings.extract_html {
            let report = convert_document(&self.converter, &file.path, settings, output_dir);
            result.attempts = report.attempts;
            if let (FileStatus::Success, Some(output)) = (report.status, report.output_path) {
                let name = output
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                result.download_url = Some(format!("/api/download/{}/{}", job_id, name));
                result.preview_url = Some(format!("/api/preview/{}/{}", job_id, name));
                result.output_path = Some(output);
                result.html_size = report.html_size;
                result.method = report.method;
                succeeded = true;
            } else if let Some(error) = report.error {
                errors.push(error);
            }
        }

        if settings.extract_text {
            match self.write_text(file, output_dir) {
                Ok(text_file) => {
                    result.text_file = Some(text_file);
                    result.text_status = Some(TextStatus::Success);
                    succeeded = true;
                }
                Err(error) => {
                    tracing::warn!("[{}] Text extraction failed for {}: {}", job_id, file.filename, error);
                    result.text_status = Some(TextStatus::Failed);
                    errors.push(error);
                }
            }
        }

        if succeeded {
            result.status = FileStatus::Success;
        } else {
            result.error = Some(errors.join("; "));
        }
        result
    }

    /// Write `<stem>.txt`; the error is the extractor's in-band message
    fn write_text(
        &self,
        file: &FileDescriptor,
        output_dir: &Path,
    ) -> std::result::Result<PathBuf, String> {
        let extractor = TextExtractor::new(self.converter.tools().clone());
        let (text_file, _) = extractor.extract_to(&file.path, output_dir)?;
        Ok(text_file)
    }
}
