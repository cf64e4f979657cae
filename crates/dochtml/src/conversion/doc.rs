//! Legacy .doc conversion through bridging tools
//!
//! HTML: Word -> DOCX, LibreOffice -> DOCX, LibreOffice -> HTML, raw package text.
//! Text: Word -> DOCX text, LibreOffice -> DOCX text, antiword, raw package text.
//! Stages whose tool is missing on the host are skipped.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{Html, Selector};
use std::path::Path;

use super::ooxml::DocxPackage;
use super::text::docx_paragraph_text;
use super::{
    data_uri, display_name, escape_html, sniff_image_mime, Cascade, ConversionOutcome,
    ConversionStrategy, Converted, DocxConverter,
};
use crate::backends::{OfficeTarget, Toolset};
use crate::error::{Error, Result};

pub const DOC_HTML_FAILURE: &str =
    "Unable to convert DOC file. Please try converting to DOCX first.";
pub const DOC_TEXT_FAILURE: &str = "Error: Could not extract text from DOC file";

static IMG_SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(<img\b[^>]*?\bsrc\s*=\s*")([^"]+)(")"#).expect("Invalid img regex"));

pub struct DocConverter<'a> {
    tools: &'a Toolset,
}

impl<'a> DocConverter<'a> {
    pub fn new(tools: &'a Toolset) -> Self {
        Self { tools }
    }

    /// HTML cascade
    pub fn html_cascade(&self) -> Cascade<'a> {
        Cascade::new("doc_html")
            .then(WordDocxHtml { tools: self.tools })
            .then(OfficeDocxHtml { tools: self.tools })
            .then(OfficeHtml { tools: self.tools })
            .then(RawPackageHtml)
    }

    /// Text cascade
    pub fn text_cascade(&self) -> Cascade<'a> {
        Cascade::new("doc_text")
            .then(WordDocxText { tools: self.tools })
            .then(OfficeDocxText { tools: self.tools })
            .then(LegacyText { tools: self.tools })
            .then(RawPackageText)
    }

    pub fn convert_html(&self, path: &Path) -> Result<Converted> {
        self.html_cascade()
            .run(path)
            .map_err(|_| Error::exhausted(display_name(path), DOC_HTML_FAILURE))
    }

    /// Never fails; exhaustion yields an error-prefixed string
    pub fn extract_text(&self, path: &Path) -> String {
        match self.text_cascade().run(path) {
            Ok(converted) => converted.content,
            Err(_) => DOC_TEXT_FAILURE.to_string(),
        }
    }
}

/// Save as .docx in a scratch directory through Word or LibreOffice, then
/// hand the result to `then`
fn via_docx<F>(tools: &Toolset, use_word: bool, input: &Path, then: F) -> Result<String>
where
    F: FnOnce(&Path) -> Result<String>,
{
    let scratch = tempfile::tempdir()?;
    let docx = if use_word {
        tools.word.convert_to_docx(input, scratch.path())?
    } else {
        tools.office.convert(input, OfficeTarget::Docx, scratch.path())?
    };
    then(&docx)
}

fn docx_html(docx: &Path) -> Result<String> {
    DocxConverter::new().convert(docx).map(|c| c.content)
}

struct WordDocxHtml<'a> {
    tools: &'a Toolset,
}

impl ConversionStrategy for WordDocxHtml<'_> {
    fn name(&self) -> &'static str {
        "word_docx"
    }

    fn is_available(&self) -> bool {
        self.tools.word.is_available()
    }

    fn attempt(&self, input: &Path) -> ConversionOutcome {
        ConversionOutcome::from_result(via_docx(self.tools, true, input, docx_html))
    }
}

struct OfficeDocxHtml<'a> {
    tools: &'a Toolset,
}

impl ConversionStrategy for OfficeDocxHtml<'_> {
    fn name(&self) -> &'static str {
        "soffice_docx"
    }

    fn is_available(&self) -> bool {
        self.tools.office.is_available()
    }

    fn attempt(&self, input: &Path) -> ConversionOutcome {
        ConversionOutcome::from_result(via_docx(self.tools, false, input, docx_html))
    }
}

struct OfficeHtml<'a> {
    tools: &'a Toolset,
}

impl ConversionStrategy for OfficeHtml<'_> {
    fn name(&self) -> &'static str {
        "soffice_html"
    }

    fn is_available(&self) -> bool {
        self.tools.office.is_available()
    }

    fn attempt(&self, input: &Path) -> ConversionOutcome {
        let result = (|| -> Result<String> {
            let scratch = tempfile::tempdir()?;
            let html_path = self.tools.office.convert(input, OfficeTarget::Html, scratch.path())?;
            let raw = std::fs::read(&html_path)?;
            let html = String::from_utf8_lossy(&raw);
            Ok(inline_local_images(&body_content(&html), scratch.path()))
        })();
        ConversionOutcome::from_result(result)
    }
}

/// Last resort: the file may be an OOXML package with a .doc name
struct RawPackageHtml;

impl ConversionStrategy for RawPackageHtml {
    fn name(&self) -> &'static str {
        "raw_text"
    }

    fn attempt(&self, input: &Path) -> ConversionOutcome {
        ConversionOutcome::from_result(DocxPackage::read(input).map(|doc| {
            doc.raw_text()
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| format!("<p>{}</p>", escape_html(line)))
                .collect::<Vec<_>>()
                .join("\n")
        }))
    }
}

struct WordDocxText<'a> {
    tools: &'a Toolset,
}

impl ConversionStrategy for WordDocxText<'_> {
    fn name(&self) -> &'static str {
        "word_docx"
    }

    fn is_available(&self) -> bool {
        self.tools.word.is_available()
    }

    fn attempt(&self, input: &Path) -> ConversionOutcome {
        ConversionOutcome::from_result(via_docx(self.tools, true, input, docx_paragraph_text))
    }
}

struct OfficeDocxText<'a> {
    tools: &'a Toolset,
}

impl ConversionStrategy for OfficeDocxText<'_> {
    fn name(&self) -> &'static str {
        "soffice_docx"
    }

    fn is_available(&self) -> bool {
        self.tools.office.is_available()
    }

    fn attempt(&self, input: &Path) -> ConversionOutcome {
        ConversionOutcome::from_result(via_docx(self.tools, false, input, docx_paragraph_text))
    }
}

struct LegacyText<'a> {
    tools: &'a Toolset,
}

impl ConversionStrategy for LegacyText<'_> {
    fn name(&self) -> &'static str {
        "antiword"
    }

    fn is_available(&self) -> bool {
        self.tools.legacy_text.is_available()
    }

    fn attempt(&self, input: &Path) -> ConversionOutcome {
        ConversionOutcome::from_result(self.tools.legacy_text.extract_text(input))
    }
}

struct RawPackageText;

impl ConversionStrategy for RawPackageText {
    fn name(&self) -> &'static str {
        "raw_text"
    }

    fn attempt(&self, input: &Path) -> ConversionOutcome {
        ConversionOutcome::from_result(DocxPackage::read(input).map(|doc| doc.raw_text()))
    }
}

/// Inner HTML of `<body>`, or the input unchanged when there is none
pub fn body_content(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("body") else {
        return html.to_string();
    };
    document
        .select(&selector)
        .next()
        .map(|body| body.inner_html().trim().to_string())
        .unwrap_or_else(|| html.to_string())
}

/// LibreOffice writes images next to the HTML; embed the ones that exist
fn inline_local_images(html: &str, dir: &Path) -> String {
    IMG_SRC_RE
        .replace_all(html, |caps: &Captures| {
            let src = &caps[2];
            if src.starts_with("data:") || src.contains("://") || src.contains("..") {
                return caps[0].to_string();
            }
            let inlined = std::fs::read(dir.join(src))
                .ok()
                .and_then(|bytes| sniff_image_mime(&bytes).map(|mime| data_uri(mime, &bytes)));
            match inlined {
                Some(uri) => format!("{}{}{}", &caps[1], uri, &caps[3]),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
