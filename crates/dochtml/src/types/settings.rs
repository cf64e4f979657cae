//! Per-job conversion settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_IMAGE_QUALITY: u8 = 85;
pub const DEFAULT_PDF_DPI: u32 = 150;
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Settings applied to every file of a job. Immutable once the job is created.
///
/// Deserialization is lenient: missing keys take their defaults, an out of
/// range `image_quality` is clamped to 1..=100 and a non-positive `pdf_dpi`
/// or `max_workers` falls back to the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSettings")]
pub struct Settings {
    /// Allow the OCR stage for PDFs without a usable text layer
    pub enable_ocr: bool,
    /// JPEG quality of rasterized pages
    pub image_quality: u8,
    /// Rasterization resolution
    pub pdf_dpi: u32,
    /// Produce `<stem>.html`
    pub extract_html: bool,
    /// Produce `<stem>.txt`
    pub extract_text: bool,
    /// Parallelism of the batch entrypoint. Jobs ignore it.
    pub max_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_ocr: true,
            image_quality: DEFAULT_IMAGE_QUALITY,
            pdf_dpi: DEFAULT_PDF_DPI,
            extract_html: true,
            extract_text: true,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl Settings {
    /// Builder-style OCR toggle
    pub fn with_ocr(mut self, enabled: bool) -> Self {
        self.enable_ocr = enabled;
        self
    }

    /// True when the job has nothing to produce
    pub fn produces_nothing(&self) -> bool {
        !self.extract_html && !self.extract_text
    }

    /// Settings from individual camelCase form fields (`enableOcr`,
    /// `imageQuality`, `pdfDpi`, `maxWorkers`, `extractHtml`, `extractText`).
    /// Missing or unparsable values take their defaults.
    pub fn from_form(fields: &HashMap<String, String>) -> Self {
        let flag = |key: &str| {
            fields
                .get(key)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(true)
        };
        let number = |key: &str, default: i64| {
            fields
                .get(key)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(default)
        };

        RawSettings {
            enable_ocr: flag("enableOcr"),
            image_quality: number("imageQuality", default_quality()),
            pdf_dpi: number("pdfDpi", default_dpi()),
            extract_html: flag("extractHtml"),
            extract_text: flag("extractText"),
            max_workers: number("maxWorkers", default_workers()),
        }
        .into()
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default = "default_true")]
    enable_ocr: bool,
    #[serde(default = "default_quality")]
    image_quality: i64,
    #[serde(default = "default_dpi")]
    pdf_dpi: i64,
    #[serde(default = "default_true")]
    extract_html: bool,
    #[serde(default = "default_true")]
    extract_text: bool,
    #[serde(default = "default_workers")]
    max_workers: i64,
}

fn default_true() -> bool { true }
fn default_quality() -> i64 { DEFAULT_IMAGE_QUALITY as i64 }
fn default_dpi() -> i64 { DEFAULT_PDF_DPI as i64 }
fn default_workers() -> i64 { DEFAULT_MAX_WORKERS as i64 }

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        let pdf_dpi = if raw.pdf_dpi > 0 {
            u32::try_from(raw.pdf_dpi).unwrap_or(DEFAULT_PDF_DPI)
        } else {
            DEFAULT_PDF_DPI
        };
        let max_workers = if raw.max_workers > 0 {
            usize::try_from(raw.max_workers).unwrap_or(DEFAULT_MAX_WORKERS)
        } else {
            DEFAULT_MAX_WORKERS
        };

        Self {
            enable_ocr: raw.enable_ocr,
            image_quality: raw.image_quality.clamp(1, 100) as u8,
            pdf_dpi,
            extract_html: raw.extract_html,
            extract_text: raw.extract_text,
            max_workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_quality_is_clamped() {
        let high: Settings = serde_json::from_str(r#"{"image_quality": 400}"#).unwrap();
        let low: Settings = serde_json::from_str(r#"{"image_quality": -3}"#).unwrap();
        assert_eq!(high.image_quality, 100);
        assert_eq!(low.image_quality, 1);
    }

    #[test]
    fn test_non_positive_dpi_falls_back() {
        let settings: Settings = serde_json::from_str(r#"{"pdf_dpi": 0, "max_workers": -1}"#).unwrap();
        assert_eq!(settings.pdf_dpi, DEFAULT_PDF_DPI);
        assert_eq!(settings.max_workers, DEFAULT_MAX_WORKERS);
    }

    #[test]
    fn test_partial_settings() {
        let settings: Settings =
            serde_json::from_str(r#"{"enable_ocr": false, "pdf_dpi": 300, "extract_text": false}"#)
                .unwrap();
        assert!(!settings.enable_ocr);
        assert_eq!(settings.pdf_dpi, 300);
        assert!(settings.extract_html);
        assert!(!settings.extract_text);
        assert!(!settings.produces_nothing());
    }

    #[test]
    fn test_from_form_fields() {
        let fields: HashMap<String, String> = [
            ("enableOcr", "off"),
            ("imageQuality", "250"),
            ("pdfDpi", "not a number"),
            ("extractText", "Yes"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let settings = Settings::from_form(&fields);
        assert!(!settings.enable_ocr);
        assert_eq!(settings.image_quality, 100);
        assert_eq!(settings.pdf_dpi, DEFAULT_PDF_DPI);
        assert!(settings.extract_html);
        assert!(settings.extract_text);
        assert_eq!(Settings::from_form(&HashMap::new()), Settings::default());
    }
}
