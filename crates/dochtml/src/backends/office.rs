//! LibreOffice and antiword command-line backends

use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{command_available, command_spawns, LegacyTextTool, OfficeSuite, OfficeTarget};
use crate::error::{Error, Result};

/// Headless LibreOffice (`soffice --headless --convert-to`)
pub struct SofficeSuite {
    program: String,
    available: OnceCell<bool>,
}

impl SofficeSuite {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            available: OnceCell::new(),
        }
    }
}

impl OfficeSuite for SofficeSuite {
    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| command_available(&self.program, "--version"))
    }

    fn convert(&self, input: &Path, target: OfficeTarget, out_dir: &Path) -> Result<PathBuf> {
        let strategy = format!("soffice_{}", target.extension());

        let output = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg(target.extension())
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .output()
            .map_err(|e| Error::strategy(&strategy, format!("Failed to run LibreOffice: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::strategy(
                &strategy,
                format!("LibreOffice conversion failed: {}", stderr.trim()),
            ));
        }

        let stem = input
            .file_stem()
            .ok_or_else(|| Error::strategy(&strategy, "input has no file name"))?;
        let produced = out_dir.join(format!("{}.{}", stem.to_string_lossy(), target.extension()));
        if !produced.exists() {
            return Err(Error::strategy(
                &strategy,
                format!("LibreOffice did not produce {}", produced.display()),
            ));
        }

        tracing::debug!("LibreOffice converted {} -> {}", input.display(), produced.display());
        Ok(produced)
    }
}

/// `antiword` raw text extraction for legacy .doc files
pub struct AntiwordTool {
    program: String,
    available: OnceCell<bool>,
}

impl AntiwordTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            available: OnceCell::new(),
        }
    }
}

impl LegacyTextTool for AntiwordTool {
    fn is_available(&self) -> bool {
        // antiword prints usage and exits non-zero on -h
        *self.available.get_or_init(|| command_spawns(&self.program, "-h"))
    }

    fn extract_text(&self, input: &Path) -> Result<String> {
        let output = Command::new(&self.program)
            .arg(input)
            .output()
            .map_err(|e| Error::strategy("antiword", format!("Failed to run antiword: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::strategy("antiword", format!("antiword failed: {}", stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binaries_are_unavailable() {
        assert!(!SofficeSuite::new("/nonexistent/soffice").is_available());
        assert!(!AntiwordTool::new("/nonexistent/antiword").is_available());
    }

    #[test]
    fn test_convert_with_missing_binary_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let err = SofficeSuite::new("/nonexistent/soffice")
            .convert(Path::new("old.doc"), OfficeTarget::Html, dir.path())
            .unwrap_err();
        assert!(matches!(err, Error::StrategyFailure { ref strategy, .. } if strategy == "soffice_html"));
    }
}
