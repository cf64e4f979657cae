//! OCR through the tesseract CLI in TSV mode

use once_cell::sync::OnceCell;
use std::path::Path;
use std::process::Command;

use super::{command_available, OcrEngine, OcrToken};
use crate::error::{Error, Result};

const STRATEGY: &str = "tesseract";

/// Word-level OCR using `tesseract <image> stdout -l <lang> tsv`
pub struct TesseractOcr {
    program: String,
    language: String,
    available: OnceCell<bool>,
}

impl TesseractOcr {
    pub fn new(program: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: language.into(),
            available: OnceCell::new(),
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| command_available(&self.program, "--version"))
    }

    fn recognize(&self, image: &Path) -> Result<Vec<OcrToken>> {
        let output = Command::new(&self.program)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("tsv")
            .output()
            .map_err(|e| Error::strategy(STRATEGY, format!("Failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::strategy(STRATEGY, format!("tesseract failed: {}", stderr.trim())));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse tesseract TSV rows:
/// level page_num block_num par_num line_num word_num left top width height conf text
///
/// Structural rows (no text column) are dropped; confidence filtering is
/// left to the caller.
pub fn parse_tsv(tsv: &str) -> Vec<OcrToken> {
    tsv.lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < 12 {
                return None;
            }
            let block = cols[2].trim().parse().ok()?;
            let confidence = cols[10].trim().parse().ok()?;
            let text = cols[11..].join("\t");
            Some(OcrToken {
                text,
                confidence,
                block,
            })
        })
        .collect()
}
