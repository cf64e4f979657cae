//! Input format classification

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Doc,
    Docx,
}

impl DocumentFormat {
    /// Map a bare extension (any case, no dot) to a format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Classifies files by their trailing extension
pub struct FormatDetector;

impl FormatDetector {
    /// Detect the format of `path`, rejecting anything but pdf, doc and docx
    pub fn detect(path: &Path) -> Result<DocumentFormat> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        DocumentFormat::from_extension(ext).ok_or_else(|| {
            if ext.is_empty() {
                Error::UnsupportedFormat("(none)".to_string())
            } else {
                Error::UnsupportedFormat(format!(".{}", ext.to_lowercase()))
            }
        })
    }

    /// Upload filter
    pub fn is_allowed(filename: &str) -> bool {
        Self::detect(Path::new(filename)).is_ok()
    }
}
