//! Per-job upload and output directories

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::types::FormatDetector;

/// Filesystem layout: `<upload_root>/<job_id>/` and `<output_root>/<job_id>/`
#[derive(Debug, Clone)]
pub struct AssetStore {
    upload_root: PathBuf,
    output_root: PathBuf,
}

impl AssetStore {
    pub fn new(upload_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            upload_root: upload_root.into(),
            output_root: output_root.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.upload_root, &config.output_root)
    }

    pub fn upload_dir(&self, job_id: Uuid) -> PathBuf {
        self.upload_root.join(job_id.to_string())
    }

    pub fn output_dir(&self, job_id: Uuid) -> PathBuf {
        self.output_root.join(job_id.to_string())
    }

    /// Store an uploaded file under its sanitized name
    pub fn save_upload(&self, job_id: Uuid, filename: &str, data: &[u8]) -> Result<PathBuf> {
        let safe = sanitize_filename(filename)
            .ok_or_else(|| Error::InvalidRequest(format!("Invalid filename: {}", filename)))?;
        let dir = self.upload_dir(job_id);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(&safe);
        std::fs::write(&path, data)?;
        Ok(path)
    }

    /// Uploaded input `filename` of `job_id`
    pub fn resolve_upload(&self, job_id: Uuid, filename: &str) -> Result<PathBuf> {
        resolve_within(&self.upload_dir(job_id), filename)
    }

    /// Supported documents uploaded for `job_id`, sorted by name
    pub fn list_uploads(&self, job_id: Uuid) -> Result<Vec<PathBuf>> {
        let dir = self.upload_dir(job_id);
        if !dir.is_dir() {
            return Err(Error::not_found(format!("No files found for job {}", job_id)));
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .map(|n| FormatDetector::is_allowed(&n.to_string_lossy()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Output `filename` of `job_id`
    pub fn resolve_output(&self, job_id: Uuid, filename: &str) -> Result<PathBuf> {
        resolve_within(&self.output_dir(job_id), filename)
    }

    /// Delete both directories of a job. Missing directories are fine.
    pub fn remove_job(&self, job_id: Uuid) {
        for dir in [self.upload_dir(job_id), self.output_dir(job_id)] {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(&dir) {
                    tracing::warn!("[{}] Failed to remove {}: {}", job_id, dir.display(), e);
                }
            }
        }
    }

    /// Zip `outputs` into `<output_dir>/<job_id>_converted_files.zip`
    pub fn bundle_outputs(&self, job_id: Uuid, outputs: &[PathBuf]) -> Result<PathBuf> {
        let dir = self.output_dir(job_id);
        std::fs::create_dir_all(&dir)?;
        let zip_path = dir.join(format!("{}_converted_files.zip", job_id));

        let file = std::fs::File::create(&zip_path)?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut added = 0;
        for output in outputs {
            let Some(name) = output.file_name() else { continue };
            let data = match std::fs::read(output) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("[{}] Skipping {} in archive: {}", job_id, output.display(), e);
                    continue;
                }
            };
            zip.start_file(name.to_string_lossy(), options)?;
            zip.write_all(&data)?;
            added += 1;
        }
        zip.finish()?;

        tracing::info!("[{}] Bundled {} outputs into {}", job_id, added, zip_path.display());
        Ok(zip_path)
    }
}

/// Join a single plain file name onto `dir`, refusing anything that could
/// leave it
fn resolve_within(dir: &Path, filename: &str) -> Result<PathBuf> {
    let candidate = Path::new(filename);
    let mut components = candidate.components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !plain || filename.contains('\\') {
        return Err(Error::not_found(format!("File {} not found", filename)));
    }

    let path = dir.join(candidate);
    if !path.is_file() {
        return Err(Error::not_found(format!("File {} not found", filename)));
    }
    Ok(path)
}

/// ASCII-only file name safe to store: separators become spaces, whitespace
/// runs become `_`, anything outside `[A-Za-z0-9_.-]` is dropped and leading
/// or trailing dots and underscores are trimmed. `None` when nothing is left.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let spaced: String = filename
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
