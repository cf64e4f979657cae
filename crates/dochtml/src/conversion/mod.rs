//! Format converters and the fallback cascade that drives them
//!
//! Every converter is an ordered list of strategies. A strategy never raises
//! past its own boundary: it reports a [`ConversionOutcome`] and the
//! [`Cascade`] decides whether to move on to the next stage.

pub mod doc;
pub mod docx;
pub mod ooxml;
pub mod pdf;
pub mod text;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

pub use doc::DocConverter;
pub use docx::DocxConverter;
pub use pdf::PdfConverter;
pub use text::TextExtractor;

use crate::backends::Toolset;
use crate::error::{Error, Result};
use crate::types::{DocumentFormat, FormatDetector, Settings};

/// Result of a single strategy attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Success(String),
    Failure(String),
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Lift a fallible step into an outcome
    pub fn from_result(result: Result<String>) -> Self {
        match result {
            Ok(content) => Self::Success(content),
            Err(e) => Self::Failure(e.to_string()),
        }
    }
}

/// Attempt record kept for every stage that actually ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub chars: usize,
    pub duration_ms: u64,
}

impl StrategyAttempt {
    fn record(strategy: &str, outcome: &ConversionOutcome, duration_ms: u64) -> Self {
        match outcome {
            ConversionOutcome::Success(content) => Self {
                strategy: strategy.to_string(),
                success: true,
                error: None,
                chars: content.chars().count(),
                duration_ms,
            },
            ConversionOutcome::Failure(reason) => Self {
                strategy: strategy.to_string(),
                success: false,
                error: Some(reason.clone()),
                chars: 0,
                duration_ms,
            },
        }
    }
}

/// One stage of a fallback chain
pub trait ConversionStrategy: Send + Sync {
    /// Stage name used in logs and attempt records
    fn name(&self) -> &'static str;

    /// Unavailable stages are skipped without an attempt record
    fn is_available(&self) -> bool {
        true
    }

    fn attempt(&self, input: &Path) -> ConversionOutcome;
}

/// Successful conversion along with the attempts that led to it
#[derive(Debug, Clone)]
pub struct Converted {
    /// HTML fragment or plain text
    pub content: String,
    /// Stage that produced `content`
    pub method: String,
    pub attempts: Vec<StrategyAttempt>,
}

/// Every stage failed or was unavailable
#[derive(Debug, Clone, Default)]
pub struct CascadeFailure {
    pub attempts: Vec<StrategyAttempt>,
}

impl CascadeFailure {
    /// One line per attempt, for logs
    pub fn summary(&self) -> String {
        if self.attempts.is_empty() {
            return "no stage was available".to_string();
        }
        self.attempts
            .iter()
            .map(|a| {
                format!(
                    "{}: {} ({}ms)",
                    a.strategy,
                    a.error.as_deref().unwrap_or("unknown error"),
                    a.duration_ms
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Ordered fallback chain. The first stage with non-empty output wins and
/// later stages are never invoked.
pub struct Cascade<'a> {
    label: String,
    stages: Vec<Box<dyn ConversionStrategy + 'a>>,
}

impl<'a> Cascade<'a> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            stages: Vec::new(),
        }
    }

    /// Append a stage
    pub fn then(mut self, stage: impl ConversionStrategy + 'a) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn run(&self, input: &Path) -> std::result::Result<Converted, CascadeFailure> {
        let filename = display_name(input);
        let mut attempts = Vec::new();

        for stage in &self.stages {
            if !stage.is_available() {
                tracing::debug!("[{}] {}: '{}' unavailable, skipping", filename, self.label, stage.name());
                continue;
            }

            let started = Instant::now();
            let outcome = match catch_unwind(AssertUnwindSafe(|| stage.attempt(input))) {
                Ok(ConversionOutcome::Success(content)) if content.trim().is_empty() => {
                    ConversionOutcome::Failure("Empty output".to_string())
                }
                Ok(outcome) => outcome,
                Err(payload) => ConversionOutcome::Failure(format!(
                    "panicked: {}",
                    panic_message(payload.as_ref())
                )),
            };
            let duration_ms = started.elapsed().as_millis() as u64;
            attempts.push(StrategyAttempt::record(stage.name(), &outcome, duration_ms));

            match outcome {
                ConversionOutcome::Success(content) => {
                    tracing::info!(
                        "[{}] {} succeeded with '{}': {} chars in {}ms",
                        filename,
                        self.label,
                        stage.name(),
                        content.len(),
                        duration_ms
                    );
                    return Ok(Converted {
                        content,
                        method: stage.name().to_string(),
                        attempts,
                    });
                }
                ConversionOutcome::Failure(reason) => {
                    tracing::warn!("[{}] {} stage '{}' failed: {}", filename, self.label, stage.name(), reason);
                }
            }
        }

        let failure = CascadeFailure { attempts };
        tracing::error!("[{}] {} exhausted: {}", filename, self.label, failure.summary());
        Err(failure)
    }
}

/// Format-dispatching HTML converter used by the job worker and batch runs
#[derive(Clone)]
pub struct HtmlConverter {
    tools: Toolset,
}

impl HtmlConverter {
    pub fn new(tools: Toolset) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &Toolset {
        &self.tools
    }

    /// Convert `path` into an HTML fragment using the cascade for its format
    pub fn convert(&self, path: &Path, settings: &Settings) -> Result<Converted> {
        match FormatDetector::detect(path)? {
            DocumentFormat::Pdf => PdfConverter::new(&self.tools).convert(path, settings),
            DocumentFormat::Docx => DocxConverter::new().convert(path),
            DocumentFormat::Doc => DocConverter::new(&self.tools).convert_html(path),
        }
    }

    pub fn text_extractor(&self) -> TextExtractor {
        TextExtractor::new(self.tools.clone())
    }
}

/// Escape text for insertion into HTML content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid tag regex"));

/// Text left once markup is removed
pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, " ").into_owned()
}

/// Number of visible non-whitespace-trimmed characters in a fragment
pub fn visible_text_len(html: &str) -> usize {
    let stripped = strip_tags(html);
    stripped.split_whitespace().collect::<Vec<_>>().join(" ").chars().count()
}

/// Base64 data URI
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// PNG or JPEG by magic number
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else {
        None
    }
}

/// Best-effort message of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Failure produced when a stage's backing tool is missing at attempt time
pub(crate) fn unavailable(strategy: &str) -> Error {
    Error::strategy(strategy, "tool not available on this host")
}
