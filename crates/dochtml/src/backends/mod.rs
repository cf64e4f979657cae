//! External capabilities used by the fallback stages
//!
//! Each capability sits behind a trait so the cascades can be driven by
//! in-process fakes in tests and so hosts without a given tool simply report
//! the stage as unavailable.
//!
//! Supports:
//! - lopdf - PDF text layer and embedded raster images
//! - pdftoppm (poppler-utils) - page rasterization for OCR
//! - tesseract - OCR with word-level TSV output
//! - Microsoft Word via PowerShell COM (Windows only)
//! - LibreOffice (soffice) - headless conversion of legacy documents
//! - antiword - raw text from legacy .doc files

pub mod office;
pub mod pdf_layer;
pub mod poppler;
pub mod tesseract;
pub mod word;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

pub use office::{AntiwordTool, SofficeSuite};
pub use pdf_layer::LopdfTextLayer;
pub use poppler::PdftoppmRasterizer;
pub use tesseract::TesseractOcr;
pub use word::{detect_word_automation, PowerShellWord, UnavailableWord};

use crate::config::ToolsConfig;
use crate::error::Result;

/// Raster image pulled out of a PDF page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// `image/png` or `image/jpeg`
    pub mime: &'static str,
    pub data: Vec<u8>,
}

/// Text layer of one PDF page
#[derive(Debug, Clone, Default)]
pub struct PdfPage {
    /// 1-based page number
    pub number: u32,
    /// Plain text of the page
    pub text: String,
    /// Page text as HTML. May carry inline styles; callers sanitize.
    pub markup: String,
    pub images: Vec<PageImage>,
}

/// One recognized word
#[derive(Debug, Clone, PartialEq)]
pub struct OcrToken {
    pub text: String,
    pub confidence: f32,
    /// Layout block the word belongs to
    pub block: u32,
}

/// Target of a headless office-suite conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeTarget {
    Html,
    Docx,
}

impl OfficeTarget {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Docx => "docx",
        }
    }
}

/// Reads the text layer of a PDF
pub trait PdfTextLayer: Send + Sync {
    fn extract_pages(&self, pdf: &Path) -> Result<Vec<PdfPage>>;
}

/// Renders PDF pages to images
pub trait PageRasterizer: Send + Sync {
    fn is_available(&self) -> bool;

    /// Rasterize every page into `out_dir`, returning image paths in page order
    fn rasterize(&self, pdf: &Path, dpi: u32, quality: u8, out_dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Word-level optical character recognition
pub trait OcrEngine: Send + Sync {
    fn is_available(&self) -> bool;

    /// Tokens in reading order
    fn recognize(&self, image: &Path) -> Result<Vec<OcrToken>>;
}

/// Native word-processor automation
pub trait WordAutomation: Send + Sync {
    fn is_available(&self) -> bool;

    /// Save `input` as a .docx inside `out_dir`
    fn convert_to_docx(&self, input: &Path, out_dir: &Path) -> Result<PathBuf>;
}

/// Headless office suite
pub trait OfficeSuite: Send + Sync {
    fn is_available(&self) -> bool;

    /// Convert `input` into `out_dir`, returning the produced file
    fn convert(&self, input: &Path, target: OfficeTarget, out_dir: &Path) -> Result<PathBuf>;
}

/// Dedicated legacy-format text extractor
pub trait LegacyTextTool: Send + Sync {
    fn is_available(&self) -> bool;

    fn extract_text(&self, input: &Path) -> Result<String>;
}

/// The set of capabilities handed to converters
#[derive(Clone)]
pub struct Toolset {
    pub pdf_layer: Arc<dyn PdfTextLayer>,
    pub rasterizer: Arc<dyn PageRasterizer>,
    pub ocr: Arc<dyn OcrEngine>,
    pub word: Arc<dyn WordAutomation>,
    pub office: Arc<dyn OfficeSuite>,
    pub legacy_text: Arc<dyn LegacyTextTool>,
}

impl Toolset {
    /// Default implementations configured from `tools`. Availability is
    /// checked lazily by each stage, so detection itself never fails.
    pub fn detect(tools: &ToolsConfig) -> Self {
        let toolset = Self {
            pdf_layer: Arc::new(LopdfTextLayer::new()),
            rasterizer: Arc::new(PdftoppmRasterizer::new(&tools.pdftoppm)),
            ocr: Arc::new(TesseractOcr::new(&tools.tesseract, &tools.ocr_language)),
            word: detect_word_automation(&tools.powershell),
            office: Arc::new(SofficeSuite::new(&tools.soffice)),
            legacy_text: Arc::new(AntiwordTool::new(&tools.antiword)),
        };

        tracing::info!(
            "Conversion tools: pdftoppm={}, tesseract={}, soffice={}, antiword={}, word={}",
            toolset.rasterizer.is_available(),
            toolset.ocr.is_available(),
            toolset.office.is_available(),
            toolset.legacy_text.is_available(),
            toolset.word.is_available()
        );

        toolset
    }
}

/// Whether `program` runs and exits successfully with `check_arg`
pub(crate) fn command_available(program: &str, check_arg: &str) -> bool {
    Command::new(program)
        .arg(check_arg)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Whether `program` can be spawned at all. Some tools exit non-zero on
/// their version flag.
pub(crate) fn command_spawns(program: &str, check_arg: &str) -> bool {
    Command::new(program).arg(check_arg).output().is_ok()
}
