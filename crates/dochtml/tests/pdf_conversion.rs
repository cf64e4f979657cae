//! PDF conversion through the text layer and the OCR stage

mod common;

use std::sync::atomic::Ordering;

use dochtml::backends::{LopdfTextLayer, PdfTextLayer, Toolset};
use dochtml::config::ToolsConfig;
use dochtml::conversion::pdf::render_text_layer;
use dochtml::{convert_document, HtmlConverter, Settings, TextExtractor};

const PAGE_BREAK: &str = r#"<div class="page-break"></div>"#;

const PAGE_ONE: &[&str] = &[
    "Jane Doe - Senior Platform Engineer",
    "Built distributed storage services for ten years",
];
const PAGE_TWO: &[&str] = &[
    "Education: BSc Computer Science, State University",
    "Languages: Rust, Go, Python and a little bit of C",
];

#[test]
fn test_text_layer_keeps_every_string_and_breaks_between_pages() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("resume.pdf");
    common::write_text_pdf(&pdf, &[PAGE_ONE, PAGE_TWO]);

    let (tools, ocr_calls) = common::ocr_toolset(2);
    let converted = HtmlConverter::new(tools).convert(&pdf, &Settings::default()).unwrap();

    for line in PAGE_ONE.iter().chain(PAGE_TWO) {
        assert!(converted.content.contains(line), "missing {:?}", line);
    }
    assert_eq!(converted.content.matches(PAGE_BREAK).count(), 1);
    assert_eq!(converted.content.matches(r#"class="pdf-page""#).count(), 2);
    assert!(converted.content.contains(r#"data-page="2""#));
    assert_eq!(converted.method, "text_layer");
    assert_eq!(ocr_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_image_only_pdf_goes_through_ocr() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("scan.pdf");
    common::write_blank_pdf(&pdf, 2);

    let (tools, ocr_calls) = common::ocr_toolset(2);
    let settings: Settings = serde_json::from_str(r#"{"enable_ocr": true, "pdf_dpi": 150}"#).unwrap();
    let converted = HtmlConverter::new(tools).convert(&pdf, &settings).unwrap();

    assert_eq!(converted.method, "ocr");
    assert_eq!(ocr_calls.load(Ordering::SeqCst), 1);
    assert_eq!(converted.content.matches(r#"class="ocr-page""#).count(), 2);
    assert_eq!(converted.content.matches(PAGE_BREAK).count(), 1);
    assert!(converted.content.contains("<p>Scanned Resume</p>"));
    assert!(converted.content.contains("<p>Skills &amp; Tools</p>"));
    assert!(!converted.content.contains("smudge"));
    assert!(converted.content.contains("data:image/jpeg;base64,"));
}

#[test]
fn test_ocr_disabled_returns_sparse_text_layer_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("short.pdf");
    common::write_text_pdf(&pdf, &[&["Jane Doe"]]);

    let (tools, ocr_calls) = common::ocr_toolset(1);
    let settings = Settings::default().with_ocr(false);
    let converted = HtmlConverter::new(tools).convert(&pdf, &settings).unwrap();

    let expected = render_text_layer(&LopdfTextLayer::new().extract_pages(&pdf).unwrap());
    assert_eq!(converted.content, expected);
    assert_eq!(converted.method, "text_layer");
    assert_eq!(ocr_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_document_written_with_template_and_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("resume.pdf");
    common::write_text_pdf(&pdf, &[PAGE_ONE, PAGE_TWO]);
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let converter = HtmlConverter::new(Toolset::detect(&ToolsConfig::default()));
    let report = convert_document(&converter, &pdf, &Settings::default(), &out);

    assert!(report.is_success(), "{:?}", report.error);
    let html = std::fs::read_to_string(out.join("resume.html")).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>resume</title>"));
    assert!(html.contains("Senior Platform Engineer"));
    assert!(out.join("resume_metadata.json").is_file());
    assert_eq!(report.html_size, Some(html.len() as u64));
}

#[test]
fn test_text_extraction_joins_pages() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("resume.pdf");
    common::write_text_pdf(&pdf, &[PAGE_ONE, PAGE_TWO]);

    let text = TextExtractor::new(Toolset::detect(&ToolsConfig::default())).extract(&pdf);

    assert!(!TextExtractor::is_error(&text));
    assert!(text.contains("Jane Doe"));
    assert!(text.contains("State University"));
    assert!(text.find("Jane Doe") < text.find("State University"));
}
