//! Folder conversion on a bounded rayon pool
//!
//! This is the only place `Settings::max_workers` takes effect; async jobs
//! always convert their files one at a time.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::pipeline::{convert_document, DocumentReport};
use crate::conversion::HtmlConverter;
use crate::error::{Error, Result};
use crate::types::{FormatDetector, Settings};

pub const BATCH_SUMMARY_FILE: &str = "batch_summary.json";

/// Written to `batch_summary.json` in the output directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub documents: Vec<DocumentReport>,
}

/// Supported documents directly inside `folder`, sorted by name
pub fn find_documents(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map(|n| FormatDetector::is_allowed(&n.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();
    found.sort();
    found.dedup();
    Ok(found)
}

/// Convert every supported document in `folder` into `output_dir`
pub fn batch_process(
    converter: &HtmlConverter,
    folder: &Path,
    output_dir: &Path,
    settings: &Settings,
) -> Result<BatchSummary> {
    batch_process_with(converter, folder, output_dir, settings, |_| {})
}

/// [`batch_process`] with a callback fired as each document finishes
pub fn batch_process_with<F>(
    converter: &HtmlConverter,
    folder: &Path,
    output_dir: &Path,
    settings: &Settings,
    on_done: F,
) -> Result<BatchSummary>
where
    F: Fn(&DocumentReport) + Sync,
{
    let documents = find_documents(folder)?;
    std::fs::create_dir_all(output_dir)?;
    tracing::info!(
        "Converting {} documents from {} with {} workers",
        documents.len(),
        folder.display(),
        settings.max_workers
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.max_workers)
        .build()
        .map_err(|e| Error::Internal(format!("Failed to build worker pool: {}", e)))?;

    let reports: Vec<DocumentReport> = pool.install(|| {
        documents
            .par_iter()
            .map(|path| {
                let report = convert_document(converter, path, settings, output_dir);
                on_done(&report);
                report
            })
            .collect()
    });

    let successful = reports.iter().filter(|r| r.is_success()).count();
    let summary = BatchSummary {
        total: reports.len(),
        successful,
        failed: reports.len() - successful,
        documents: reports,
    };

    std::fs::write(
        output_dir.join(BATCH_SUMMARY_FILE),
        serde_json::to_string_pretty(&summary)?,
    )?;
    tracing::info!(
        "Batch finished: {}/{} converted, {} failed",
        summary.successful,
        summary.total,
        summary.failed
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_documents_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PDF", "a.docx", "c.doc", "notes.txt", "image.png"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let found = find_documents(dir.path()).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.docx", "b.PDF", "c.doc"]);
    }

    #[test]
    fn test_batch_writes_summary_and_isolates_failures() {
        use crate::backends::Toolset;
        use crate::config::ToolsConfig;
        use docx_rs::{Docx, Paragraph, Run};

        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        let file = std::fs::File::create(input.path().join("good.docx")).unwrap();
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text(
                "Twelve years of welding and fabrication across shipyards and refineries",
            )))
            .build()
            .pack(file)
            .unwrap();
        std::fs::write(input.path().join("bad.docx"), b"not a zip").unwrap();

        let converter = HtmlConverter::new(Toolset::detect(&ToolsConfig::default()));
        let settings = Settings {
            max_workers: 2,
            ..Settings::default()
        };
        let summary = batch_process(&converter, input.path(), output.path(), &settings).unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        assert!(output.path().join("good.html").is_file());
        assert!(output.path().join(BATCH_SUMMARY_FILE).is_file());
    }
}
