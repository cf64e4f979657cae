//! Microsoft Word automation (Windows only)

use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use super::WordAutomation;
use crate::error::{Error, Result};

const STRATEGY: &str = "word";
/// `wdFormatXMLDocument`
const WD_FORMAT_DOCX: u32 = 16;

/// Pick the Word backend for this host
pub fn detect_word_automation(powershell: &str) -> Arc<dyn WordAutomation> {
    if cfg!(windows) {
        Arc::new(PowerShellWord::new(powershell))
    } else {
        Arc::new(UnavailableWord)
    }
}

/// Hosts without Word
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableWord;

impl WordAutomation for UnavailableWord {
    fn is_available(&self) -> bool {
        false
    }

    fn convert_to_docx(&self, _input: &Path, _out_dir: &Path) -> Result<PathBuf> {
        Err(crate::conversion::unavailable(STRATEGY))
    }
}

/// Drives Word through COM from a PowerShell script
pub struct PowerShellWord {
    powershell: String,
    available: OnceCell<bool>,
}

impl PowerShellWord {
    pub fn new(powershell: impl Into<String>) -> Self {
        Self {
            powershell: powershell.into(),
            available: OnceCell::new(),
        }
    }

    fn run_script(&self, script: &str) -> Result<std::process::Output> {
        Command::new(&self.powershell)
            .arg("-NoProfile")
            .arg("-NonInteractive")
            .arg("-Command")
            .arg(script)
            .output()
            .map_err(|e| Error::strategy(STRATEGY, format!("Failed to run PowerShell: {}", e)))
    }
}

impl WordAutomation for PowerShellWord {
    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            self.run_script("$w = New-Object -ComObject Word.Application; $w.Quit()")
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
    }

    fn convert_to_docx(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
        let stem = input
            .file_stem()
            .ok_or_else(|| Error::strategy(STRATEGY, "input has no file name"))?;
        let target = out_dir.join(format!("{}.docx", stem.to_string_lossy()));
        let source = absolute(input)?;
        let target = absolute(&target)?;

        let output = self.run_script(&save_as_script(&source, &target))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::strategy(STRATEGY, format!("Word conversion failed: {}", stderr.trim())));
        }
        if !target.exists() {
            return Err(Error::strategy(STRATEGY, "Word did not produce a .docx file"));
        }
        Ok(target)
    }
}

/// Word resolves relative paths against its own working directory
fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// PowerShell single-quoted literal
fn ps_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "''"))
}

fn save_as_script(source: &Path, target: &Path) -> String {
    format!(
        "$ErrorActionPreference = 'Stop'; \
         $word = New-Object -ComObject Word.Application; \
         $word.Visible = $false; \
         try {{ \
           $doc = $word.Documents.Open({source}, $false, $true); \
           $doc.SaveAs([ref]{target}, [ref]{format}); \
           $doc.Close($false) \
         }} finally {{ $word.Quit() }}",
        source = ps_quote(source),
        target = ps_quote(target),
        format = WD_FORMAT_DOCX,
    )
}
