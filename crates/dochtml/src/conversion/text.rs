//! Plain-text extraction, independent of the HTML path
//!
//! Every entry point returns a `String`. Failures are reported in-band as
//! text starting with `Error`, never raised.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use super::ooxml::{Block, DocxPackage};
use super::{display_name, panic_message, DocConverter};
use crate::backends::Toolset;
use crate::error::Result;
use crate::types::{DocumentFormat, FormatDetector};

/// Prefixes of in-band failure reports
const ERROR_PREFIXES: &[&str] = &["Error: ", "Error extracting "];
const NO_TEXT: &str = "No text could be extracted";

/// Extracts plain text from PDF, DOCX and DOC files
#[derive(Clone)]
pub struct TextExtractor {
    tools: Toolset,
}

impl TextExtractor {
    pub fn new(tools: Toolset) -> Self {
        Self { tools }
    }

    pub fn extract(&self, path: &Path) -> String {
        match FormatDetector::detect(path) {
            Ok(DocumentFormat::Pdf) => self.pdf_text(path),
            Ok(DocumentFormat::Docx) => match docx_paragraph_text(path) {
                Ok(text) => text,
                Err(e) => format!("Error extracting DOCX text: {}", e),
            },
            Ok(DocumentFormat::Doc) => DocConverter::new(&self.tools).extract_text(path),
            Err(e) => format!("Error: {}", e),
        }
    }

    /// Extract and write `<stem>.txt` into `output_dir`. Blank text counts as
    /// a failure; the error is an in-band `Error...` message.
    pub fn extract_to(&self, path: &Path, output_dir: &Path) -> std::result::Result<(PathBuf, String), String> {
        let text = self.extract(path);
        if Self::is_error(&text) {
            return Err(text);
        }
        if text.trim().is_empty() {
            return Err(format!("{}{}", ERROR_PREFIXES[0], NO_TEXT));
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| display_name(path));
        let text_file = output_dir.join(format!("{}.txt", stem));
        std::fs::create_dir_all(output_dir)
            .and_then(|_| std::fs::write(&text_file, &text))
            .map_err(|e| format!("Error: failed to write text file: {}", e))?;
        Ok((text_file, text))
    }

    /// Whether `text` is an in-band failure report
    pub fn is_error(text: &str) -> bool {
        ERROR_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
    }

    /// Per-page text layer, then whole-document extraction with pdf-extract
    fn pdf_text(&self, path: &Path) -> String {
        let filename = display_name(path);

        match self.tools.pdf_layer.extract_pages(path) {
            Ok(pages) => {
                let mut text = String::new();
                for page in pages.iter().filter(|p| !p.text.trim().is_empty()) {
                    text.push_str(page.text.trim_end());
                    text.push('\n');
                }
                return text;
            }
            Err(e) => tracing::debug!("[{}] Per-page text extraction failed: {}", filename, e),
        }

        // pdf-extract panics on some malformed fonts
        match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text(path))) {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => format!("Error extracting PDF text: {}", e),
            Err(payload) => format!("Error extracting PDF text: {}", panic_message(payload.as_ref())),
        }
    }
}

/// Non-empty paragraph texts joined by newlines, tables left out
///
/// Reads the same block model as the HTML stages so both outputs agree on
/// what a paragraph is.
pub(crate) fn docx_paragraph_text(path: &Path) -> Result<String> {
    let document = DocxPackage::read(path)?;
    Ok(document
        .blocks
        .iter()
        .filter_map(|b| match b {
            Block::Paragraph(p) => Some(p.text()),
            Block::Table(_) => None,
        })
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}
