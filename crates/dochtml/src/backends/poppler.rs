//! Page rasterization with poppler's pdftoppm

use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{command_spawns, PageRasterizer};
use crate::error::{Error, Result};

const STRATEGY: &str = "pdftoppm";
const PAGE_PREFIX: &str = "page";

/// Rasterizes PDF pages to JPEG through `pdftoppm`
pub struct PdftoppmRasterizer {
    program: String,
    available: OnceCell<bool>,
}

impl PdftoppmRasterizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            available: OnceCell::new(),
        }
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| command_spawns(&self.program, "-v"))
    }

    fn rasterize(&self, pdf: &Path, dpi: u32, quality: u8, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let output = Command::new(&self.program)
            .arg("-jpeg")
            .arg("-jpegopt")
            .arg(format!("quality={}", quality))
            .arg("-r")
            .arg(dpi.to_string())
            .arg(pdf)
            .arg(out_dir.join(PAGE_PREFIX))
            .output()
            .map_err(|e| Error::strategy(STRATEGY, format!("Failed to run pdftoppm: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::strategy(STRATEGY, format!("pdftoppm failed: {}", stderr.trim())));
        }

        let pages = collect_pages(out_dir)?;
        if pages.is_empty() {
            return Err(Error::strategy(STRATEGY, "pdftoppm produced no page images"));
        }
        Ok(pages)
    }
}

/// `page-1.jpg`, `page-02.jpg` ... sorted by page number
fn collect_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?;
            let ext = path.extension()?.to_str()?;
            if !ext.eq_ignore_ascii_case("jpg") {
                return None;
            }
            let number = stem.strip_prefix(PAGE_PREFIX)?.trim_start_matches('-').parse().ok()?;
            Some((number, path))
        })
        .collect();

    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}
