//! DOCX to HTML: style-mapped rendering with a direct run-walk fallback

use image::ImageFormat;
use std::io::Cursor;
use std::path::Path;

use super::ooxml::{style_key, Block, DocxDocument, DocxPackage, Paragraph, Run, Table};
use super::{
    data_uri, display_name, escape_html, sniff_image_mime, Cascade, ConversionOutcome,
    ConversionStrategy, Converted,
};
use crate::error::{Error, Result};

/// Style-mapped output shorter than this falls back to the direct walk
pub const MIN_STYLE_MAPPED_CHARS: usize = 50;

const EMPTY_DOCUMENT: &str = "<p>Document appears to be empty or could not be processed.</p>";

/// Converts DOCX packages into HTML fragments
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxConverter;

impl DocxConverter {
    pub fn new() -> Self {
        Self
    }

    pub fn convert(&self, path: &Path) -> Result<Converted> {
        let filename = display_name(path);
        let document = DocxPackage::read(path).map_err(|e| {
            tracing::error!("[{}] Could not read DOCX package: {}", filename, e);
            Error::exhausted(&filename, format!("Error converting document: {}", e))
        })?;

        let cascade = Cascade::new("docx")
            .then(StyleMapped { document: &document })
            .then(DirectWalk { document: &document });

        let mut converted = cascade
            .run(path)
            .map_err(|failure| Error::exhausted(&filename, failure.summary()))?;

        converted.content = enhance(converted.content, &document);
        Ok(converted)
    }
}

/// Stage 1: fixed style-name table, direct bold/italic as strong/em
struct StyleMapped<'a> {
    document: &'a DocxDocument,
}

impl ConversionStrategy for StyleMapped<'_> {
    fn name(&self) -> &'static str {
        "style_mapped"
    }

    fn attempt(&self, _input: &Path) -> ConversionOutcome {
        let html = render_style_mapped(self.document);
        let length = html.trim().chars().count();
        if length < MIN_STYLE_MAPPED_CHARS {
            return ConversionOutcome::Failure(format!("minimal output ({} chars)", length));
        }
        ConversionOutcome::Success(html)
    }
}

/// Stage 2: paragraph and run walk with inline formatting
struct DirectWalk<'a> {
    document: &'a DocxDocument,
}

impl ConversionStrategy for DirectWalk<'_> {
    fn name(&self) -> &'static str {
        "direct_walk"
    }

    fn attempt(&self, _input: &Path) -> ConversionOutcome {
        ConversionOutcome::Success(render_direct(self.document))
    }
}

/// Block tag for a paragraph style under the style-mapped rendering
fn mapped_tag(paragraph: &Paragraph) -> &'static str {
    let key = paragraph.style.as_deref().map(style_key).unwrap_or_default();
    match key.as_str() {
        "heading1" | "title" => "h1",
        "heading2" | "subtitle" => "h2",
        "heading3" => "h3",
        "heading4" => "h4",
        "heading5" => "h5",
        "heading6" => "h6",
        "listparagraph" => "li",
        "quote" => "blockquote",
        _ if paragraph.numbered => "li",
        _ => "p",
    }
}

fn mapped_run(run: &Run) -> String {
    let key = run.style.as_deref().map(style_key).unwrap_or_default();
    let mut text = escape_html(&run.text).replace('\n', "<br>");
    if run.italic || key == "emphasis" {
        text = format!("<em>{}</em>", text);
    }
    if run.bold || key == "strong" {
        text = format!("<strong>{}</strong>", text);
    }
    text
}

/// Style-mapped rendering. Empty paragraphs are dropped and consecutive list
/// items share one `<ul>`.
pub fn render_style_mapped(document: &DocxDocument) -> String {
    let mut html = String::new();
    let mut in_list = false;

    for block in &document.blocks {
        match block {
            Block::Paragraph(paragraph) => {
                if paragraph.text().trim().is_empty() {
                    continue;
                }
                let tag = mapped_tag(paragraph);
                if tag == "li" && !in_list {
                    html.push_str("<ul>");
                    in_list = true;
                } else if tag != "li" && in_list {
                    html.push_str("</ul>");
                    in_list = false;
                }
                let inner: String = paragraph.runs.iter().map(mapped_run).collect();
                html.push_str(&format!("<{tag}>{inner}</{tag}>"));
            }
            Block::Table(table) => {
                if in_list {
                    html.push_str("</ul>");
                    in_list = false;
                }
                html.push_str(&render_plain_table(table));
            }
        }
    }
    if in_list {
        html.push_str("</ul>");
    }
    html
}

fn render_plain_table(table: &Table) -> String {
    let mut html = String::from("<table>");
    for row in &table.rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

/// `Heading N` -> N, clamped to h6
fn heading_level(style: &str) -> Option<u8> {
    let key = style_key(style);
    let rest = key.strip_prefix("heading")?;
    let last = rest.chars().last()?.to_digit(10)?;
    Some(last.clamp(1, 6) as u8)
}

fn alignment_style(alignment: Option<&str>) -> &'static str {
    match alignment {
        Some("center") => r#" style="text-align: center;""#,
        Some("right") | Some("end") => r#" style="text-align: right;""#,
        Some("both") | Some("justify") | Some("distribute") => r#" style="text-align: justify;""#,
        _ => "",
    }
}

fn direct_run(run: &Run) -> String {
    let mut text = escape_html(&run.text).replace('\n', "<br>");
    if run.bold {
        text = format!("<strong>{}</strong>", text);
    }
    if run.italic {
        text = format!("<em>{}</em>", text);
    }
    if run.underline {
        text = format!("<u>{}</u>", text);
    }
    if let Some(color) = run.color.as_deref() {
        text = format!(r#"<span style="color: #{};">{}</span>"#, color.to_lowercase(), text);
    }
    if let Some(size) = run.size_pt {
        text = format!(r#"<span style="font-size: {}pt;">{}</span>"#, size, text);
    }
    text
}

/// Direct walk rendering, one block per line
pub fn render_direct(document: &DocxDocument) -> String {
    let mut parts = Vec::new();

    for block in &document.blocks {
        match block {
            Block::Paragraph(paragraph) => {
                let text = paragraph.text();
                if text.trim().is_empty() {
                    continue;
                }
                let style = paragraph.style.as_deref().unwrap_or("Normal");
                let key = style_key(style);

                if let Some(level) = heading_level(style) {
                    parts.push(format!("<h{level}>{}</h{level}>", escape_html(&text)));
                } else if key == "title" {
                    parts.push(format!("<h1>{}</h1>", escape_html(&text)));
                } else if key == "subtitle" {
                    parts.push(format!("<h2>{}</h2>", escape_html(&text)));
                } else {
                    let inner: String = paragraph.runs.iter().map(direct_run).collect();
                    parts.push(format!(
                        "<p{}>{}</p>",
                        alignment_style(paragraph.alignment.as_deref()),
                        inner
                    ));
                }
            }
            Block::Table(table) => parts.push(render_docx_table(table)),
        }
    }

    if parts.is_empty() {
        return EMPTY_DOCUMENT.to_string();
    }
    parts.join("\n")
}

/// Table with the first row as header cells
pub fn render_docx_table(table: &Table) -> String {
    let mut html = String::from("<table class=\"docx-table\">\n");
    for (index, row) in table.rows.iter().enumerate() {
        let tag = if index == 0 { "th" } else { "td" };
        html.push_str("<tr>\n");
        for cell in row {
            html.push_str(&format!("<{tag}>{}</{tag}>\n", escape_html(cell.trim())));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
    html
}

/// Append embedded images, and the source tables when the chosen rendering
/// has none
fn enhance(mut html: String, document: &DocxDocument) -> String {
    let mut counter = 0;
    for image in &document.images {
        let Some((mime, data)) = embeddable_image(&image.part, &image.data) else {
            tracing::debug!("Skipping unsupported image {}", image.part);
            continue;
        };
        counter += 1;
        html.push_str(&format!(
            "\n<img src=\"{}\" alt=\"Image {}\" class=\"embedded-image\">",
            data_uri(mime, &data),
            counter
        ));
    }

    if !html.contains("<table") && document.has_tables() {
        for table in document.tables() {
            html.push('\n');
            html.push_str(&render_docx_table(table));
        }
    }
    html
}

/// PNG and JPEG pass through; GIF and BMP are re-encoded as PNG
fn embeddable_image(part: &str, data: &[u8]) -> Option<(&'static str, Vec<u8>)> {
    if let Some(mime) = sniff_image_mime(data) {
        return Some((mime, data.to_vec()));
    }

    let ext = Path::new(part)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)?;
    let format = match ext.as_str() {
        "gif" => ImageFormat::Gif,
        "bmp" => ImageFormat::Bmp,
        _ => return None,
    };

    let decoded = image::load_from_memory_with_format(data, format).ok()?;
    let mut png = Cursor::new(Vec::new());
    decoded.write_to(&mut png, ImageFormat::Png).ok()?;
    Some(("image/png", png.into_inner()))
}
