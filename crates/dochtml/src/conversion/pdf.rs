//! PDF to HTML: text layer first, OCR when the text layer is too sparse

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::Path;
use std::time::Instant;

use super::{
    data_uri, display_name, escape_html, sniff_image_mime, unavailable, visible_text_len,
    Converted, StrategyAttempt,
};
use crate::backends::{OcrToken, PdfPage, Toolset};
use crate::error::{Error, Result};
use crate::types::Settings;

/// Below this many visible characters the text layer is considered empty
pub const OCR_TRIGGER_CHARS: usize = 100;

const TEXT_LAYER: &str = "text_layer";
const OCR: &str = "ocr";
const PAGE_BREAK: &str = r#"<div class="page-break"></div>"#;

/// Inline style properties that survive sanitization
const KEPT_STYLE_PROPERTIES: &[&str] = &[
    "font-weight",
    "font-style",
    "text-decoration",
    "color",
    "background-color",
    "font-size",
    "text-align",
    "margin",
    "padding",
];

static STYLE_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s+style\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("Invalid style regex")
});

pub struct PdfConverter<'a> {
    tools: &'a Toolset,
}

impl<'a> PdfConverter<'a> {
    pub fn new(tools: &'a Toolset) -> Self {
        Self { tools }
    }

    pub fn convert(&self, path: &Path, settings: &Settings) -> Result<Converted> {
        let filename = display_name(path);
        let mut attempts = Vec::new();

        let started = Instant::now();
        let text_layer = self.tools.pdf_layer.extract_pages(path).map(|pages| render_text_layer(&pages));
        let elapsed = started.elapsed().as_millis() as u64;

        let text_layer = match text_layer {
            Ok(html) => {
                attempts.push(attempt(TEXT_LAYER, Ok(&html), elapsed));
                Some(html)
            }
            Err(e) => {
                tracing::warn!("[{}] Text layer extraction failed: {}", filename, e);
                attempts.push(attempt(TEXT_LAYER, Err(&e), elapsed));
                None
            }
        };

        let visible = text_layer.as_deref().map(visible_text_len).unwrap_or(0);
        if visible >= OCR_TRIGGER_CHARS {
            tracing::info!("[{}] Text layer yielded {} chars", filename, visible);
            return Ok(finish(text_layer.unwrap_or_default(), TEXT_LAYER, attempts));
        }

        if !settings.enable_ocr {
            return match text_layer {
                Some(html) => {
                    tracing::info!("[{}] Sparse text layer ({} chars), OCR disabled", filename, visible);
                    Ok(finish(html, TEXT_LAYER, attempts))
                }
                None => Err(Error::exhausted(filename, "Error converting PDF: no readable text layer")),
            };
        }

        tracing::info!("[{}] Text layer yielded {} chars, attempting OCR", filename, visible);
        let started = Instant::now();
        let ocr = self.convert_with_ocr(path, settings);
        let elapsed = started.elapsed().as_millis() as u64;

        match ocr {
            Ok(html) => {
                attempts.push(attempt(OCR, Ok(&html), elapsed));
                tracing::info!("[{}] OCR produced {} chars in {}ms", filename, visible_text_len(&html), elapsed);
                Ok(finish(html, OCR, attempts))
            }
            Err(e) => {
                tracing::warn!("[{}] OCR conversion failed: {}", filename, e);
                attempts.push(attempt(OCR, Err(&e), elapsed));
                match text_layer {
                    Some(html) if visible > 0 => Ok(finish(html, TEXT_LAYER, attempts)),
                    _ => Err(Error::exhausted(filename, format!("OCR conversion failed: {}", e))),
                }
            }
        }
    }

    fn convert_with_ocr(&self, path: &Path, settings: &Settings) -> Result<String> {
        if !self.tools.rasterizer.is_available() {
            return Err(unavailable("pdftoppm"));
        }
        if !self.tools.ocr.is_available() {
            return Err(unavailable("tesseract"));
        }

        let scratch = tempfile::tempdir()?;
        let images = self.tools.rasterizer.rasterize(
            path,
            settings.pdf_dpi,
            settings.image_quality,
            scratch.path(),
        )?;

        let mut parts = Vec::with_capacity(images.len() * 2);
        for (index, image_path) in images.iter().enumerate() {
            let tokens = self.tools.ocr.recognize(image_path)?;
            let image = std::fs::read(image_path)?;
            parts.push(build_ocr_page(index as u32 + 1, &tokens, &image));
            if index + 1 < images.len() {
                parts.push(PAGE_BREAK.to_string());
            }
        }
        Ok(parts.join("\n"))
    }
}

fn attempt(strategy: &str, result: std::result::Result<&String, &Error>, duration_ms: u64) -> StrategyAttempt {
    match result {
        Ok(html) => StrategyAttempt {
            strategy: strategy.to_string(),
            success: true,
            error: None,
            chars: visible_text_len(html),
            duration_ms,
        },
        Err(e) => StrategyAttempt {
            strategy: strategy.to_string(),
            success: false,
            error: Some(e.to_string()),
            chars: 0,
            duration_ms,
        },
    }
}

fn finish(content: String, method: &str, attempts: Vec<StrategyAttempt>) -> Converted {
    Converted {
        content,
        method: method.to_string(),
        attempts,
    }
}

/// Page containers with sanitized markup and embedded images, separated by
/// page-break markers
pub fn render_text_layer(pages: &[PdfPage]) -> String {
    let mut parts = Vec::with_capacity(pages.len() * 2);

    for (index, page) in pages.iter().enumerate() {
        let mut html = format!(r#"<div class="pdf-page" data-page="{}">"#, page.number);
        html.push('\n');
        html.push_str(&sanitize_styles(&page.markup));

        for (image_index, image) in page.images.iter().enumerate() {
            html.push_str(&format!(
                "\n<img src=\"{}\" alt=\"Page {} Image {}\" class=\"pdf-image\">",
                data_uri(image.mime, &image.data),
                page.number,
                image_index + 1
            ));
        }
        html.push_str("\n</div>");
        parts.push(html);

        if index + 1 < pages.len() {
            parts.push(PAGE_BREAK.to_string());
        }
    }

    parts.join("\n")
}

/// Rewrite every inline `style` attribute down to the kept properties,
/// dropping attributes left empty
pub fn sanitize_styles(markup: &str) -> String {
    STYLE_ATTR_RE
        .replace_all(markup, |caps: &Captures| {
            let style = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let cleaned = clean_style(style);
            if cleaned.is_empty() {
                String::new()
            } else {
                format!(" style=\"{}\"", cleaned.replace('"', "'"))
            }
        })
        .into_owned()
}

/// Keep whitelisted declarations of a style string
pub fn clean_style(style: &str) -> String {
    style
        .split(';')
        .filter_map(|decl| {
            let (key, value) = decl.split_once(':')?;
            let key = key.trim().to_lowercase();
            let value = value.trim();
            if value.is_empty() || !is_kept_property(&key) {
                return None;
            }
            Some(format!("{}: {}", key, value))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn is_kept_property(key: &str) -> bool {
    KEPT_STYLE_PROPERTIES.contains(&key) || key.starts_with("margin-") || key.starts_with("padding-")
}

/// Reconstruct one OCR page: the raster as a faint background and one
/// paragraph per run of same-block words
pub fn build_ocr_page(page: u32, tokens: &[OcrToken], image: &[u8]) -> String {
    let mime = sniff_image_mime(image).unwrap_or("image/jpeg");
    let mut parts = vec![
        format!(r#"<div class="ocr-page" data-page="{}">"#, page),
        r#"<div style="position: relative; width: 100%; margin-bottom: 20px;">"#.to_string(),
        format!(
            r#"<img src="{}" alt="Page {}" style="width: 100%; opacity: 0.1; position: absolute; top: 0; left: 0; z-index: -1;">"#,
            data_uri(mime, image),
            page
        ),
    ];

    let mut current: Vec<String> = Vec::new();
    let mut last_block = None;

    for token in tokens {
        if token.confidence <= 0.0 {
            continue;
        }
        let text = token.text.trim();
        if text.is_empty() {
            continue;
        }

        if last_block != Some(token.block) {
            if !current.is_empty() {
                parts.push(format!("<p>{}</p>", current.join(" ")));
            }
            current = vec![escape_html(text)];
            last_block = Some(token.block);
        } else {
            current.push(escape_html(text));
        }
    }
    if !current.is_empty() {
        parts.push(format!("<p>{}</p>", current.join(" ")));
    }

    parts.push("</div></div>".to_string());
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::PageImage;

    fn token(text: &str, confidence: f32, block: u32) -> OcrToken {
        OcrToken {
            text: text.to_string(),
            confidence,
            block,
        }
    }

    #[test]
    fn test_clean_style_keeps_whitelist() {
        let cleaned = clean_style(
            "position:absolute; top:12px; font-weight: bold; COLOR:#333; margin-left: 4px; font-family: Times; border-color: red",
        );
        assert_eq!(cleaned, "font-weight: bold; color: #333; margin-left: 4px");
    }

    #[test]
    fn test_sanitize_removes_empty_style_attributes() {
        let html = r#"<p style="position:absolute;left:10px">a</p><span style='font-style:italic;top:3px'>b</span>"#;
        assert_eq!(
            sanitize_styles(html),
            r#"<p>a</p><span style="font-style: italic">b</span>"#
        );
    }

    #[test]
    fn test_render_text_layer_page_breaks_between_pages_only() {
        let pages: Vec<PdfPage> = (1..=3)
            .map(|n| PdfPage {
                number: n,
                text: format!("Page {}", n),
                markup: format!("<p>Page {}</p>", n),
                images: Vec::new(),
            })
            .collect();

        let html = render_text_layer(&pages);
        assert_eq!(html.matches(PAGE_BREAK).count(), 2);
        assert!(!html.trim_end().ends_with(PAGE_BREAK));
        assert!(html.contains(r#"<div class="pdf-page" data-page="3">"#));
    }

    #[test]
    fn test_render_text_layer_embeds_images() {
        let pages = vec![PdfPage {
            number: 2,
            text: String::new(),
            markup: String::new(),
            images: vec![PageImage {
                mime: "image/png",
                data: vec![1, 2, 3],
            }],
        }];

        let html = render_text_layer(&pages);
        assert!(html.contains(r#"alt="Page 2 Image 1""#));
        assert!(html.contains(r#"class="pdf-image""#));
        assert!(html.contains("data:image/png;base64,AQID"));
    }

    #[test]
    fn test_ocr_page_groups_blocks_and_drops_low_confidence() {
        let tokens = vec![
            token("", -1.0, 0),
            token("Jane", 96.0, 1),
            token("Doe", 94.0, 1),
            token("noise", 0.0, 1),
            token("R&D", 91.0, 2),
            token("Lead", 90.0, 2),
        ];

        let html = build_ocr_page(1, &tokens, &[0xFF, 0xD8, 0xFF, 0xE0]);
        assert!(html.starts_with(r#"<div class="ocr-page" data-page="1">"#));
        assert!(html.contains("<p>Jane Doe</p>"));
        assert!(html.contains("<p>R&amp;D Lead</p>"));
        assert!(!html.contains("noise"));
        assert!(html.contains("data:image/jpeg;base64,"));
        assert!(html.contains("opacity: 0.1"));
    }
}
