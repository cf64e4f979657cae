//! Fixtures shared by the integration tests
#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dochtml::backends::{
    LegacyTextTool, OcrEngine, OcrToken, OfficeSuite, OfficeTarget, PageRasterizer, Toolset,
    WordAutomation,
};
use dochtml::config::ToolsConfig;
use dochtml::error::{Error, Result};

/// PDF with one page per entry, each line drawn with Courier
pub fn write_text_pdf(path: &Path, pages: &[&[&str]]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            let y = 750 - (index as i64) * 20;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![72.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// PDF whose pages have no text layer at all
pub fn write_blank_pdf(path: &Path, page_count: usize) {
    let pages: Vec<&[&str]> = (0..page_count).map(|_| &[][..]).collect();
    write_text_pdf(path, &pages);
}

/// Smallest valid JPEG header, enough for mime sniffing
pub const FAKE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

/// Writes one fake JPEG per requested page
pub struct FakeRasterizer {
    pub pages: usize,
    pub calls: Arc<AtomicUsize>,
}

impl PageRasterizer for FakeRasterizer {
    fn is_available(&self) -> bool {
        true
    }

    fn rasterize(&self, _pdf: &Path, _dpi: u32, _quality: u8, out_dir: &Path) -> Result<Vec<PathBuf>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (1..=self.pages)
            .map(|n| {
                let path = out_dir.join(format!("page-{}.jpg", n));
                std::fs::write(&path, FAKE_JPEG)?;
                Ok(path)
            })
            .collect()
    }
}

/// Recognizes the same two paragraphs on every page
pub struct FakeOcr;

impl OcrEngine for FakeOcr {
    fn is_available(&self) -> bool {
        true
    }

    fn recognize(&self, _image: &Path) -> Result<Vec<OcrToken>> {
        let token = |text: &str, confidence: f32, block: u32| OcrToken {
            text: text.to_string(),
            confidence,
            block,
        };
        Ok(vec![
            token("Scanned", 91.0, 1),
            token("Resume", 88.5, 1),
            token("smudge", -1.0, 1),
            token("Skills", 90.0, 2),
            token("&", 70.0, 2),
            token("Tools", 95.0, 2),
        ])
    }
}

/// Office suite stand-in that always fails and counts its calls
pub struct CountingOffice {
    pub available: bool,
    pub calls: Arc<AtomicUsize>,
}

impl OfficeSuite for CountingOffice {
    fn is_available(&self) -> bool {
        self.available
    }

    fn convert(&self, _input: &Path, target: OfficeTarget, _out_dir: &Path) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::strategy(format!("soffice_{}", target.extension()), "conversion crashed"))
    }
}

/// Word stand-in that copies a prepared .docx into the scratch directory
pub struct CopyingWord {
    pub source: Option<PathBuf>,
    pub calls: Arc<AtomicUsize>,
}

impl WordAutomation for CopyingWord {
    fn is_available(&self) -> bool {
        self.source.is_some()
    }

    fn convert_to_docx(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| Error::strategy("word_docx", "no source"))?;
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let target = out_dir.join(format!("{}.docx", stem));
        std::fs::copy(source, &target)?;
        Ok(target)
    }
}

/// Legacy text tool stand-in returning fixed text
pub struct FixedLegacyText {
    pub text: Option<String>,
    pub calls: Arc<AtomicUsize>,
}

impl LegacyTextTool for FixedLegacyText {
    fn is_available(&self) -> bool {
        true
    }

    fn extract_text(&self, _input: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text
            .clone()
            .ok_or_else(|| Error::strategy("antiword", "not a Word document"))
    }
}

/// Real in-process backends with OCR replaced by fakes
pub fn ocr_toolset(pages: usize) -> (Toolset, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut tools = Toolset::detect(&ToolsConfig::default());
    tools.rasterizer = Arc::new(FakeRasterizer {
        pages,
        calls: calls.clone(),
    });
    tools.ocr = Arc::new(FakeOcr);
    (tools, calls)
}

/// DOCX with a `Heading 1` paragraph and a bold run
pub fn write_resume_docx(path: &Path) {
    use docx_rs::{Docx, Paragraph, Run, Style, StyleType};

    let file = std::fs::File::create(path).unwrap();
    Docx::new()
        .add_style(Style::new("Heading1", StyleType::Paragraph).name("Heading 1"))
        .add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text("Experience"))
                .style("Heading1"),
        )
        .add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text("Lead Engineer").bold())
                .add_run(Run::new().add_text(", Example Corp, 2019 to present, leading the platform team")),
        )
        .build()
        .pack(file)
        .unwrap();
}

/// DOCX too short for the style-mapped stage, with direct run formatting
pub fn write_short_formatted_docx(path: &Path) {
    use docx_rs::{Docx, Paragraph, Run};

    let file = std::fs::File::create(path).unwrap();
    Docx::new()
        .add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text("Bold").bold())
                .add_run(Run::new().add_text(" "))
                .add_run(Run::new().add_text("Ital").italic())
                .add_run(Run::new().add_text(" "))
                .add_run(Run::new().add_text("Und").underline("single")),
        )
        .build()
        .pack(file)
        .unwrap();
}
