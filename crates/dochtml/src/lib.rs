//! dochtml: PDF, DOC and DOCX to self-contained HTML and plain text
//!
//! Every format is converted by an ordered fallback cascade of strategies,
//! from in-process parsers to external tools (poppler, tesseract,
//! LibreOffice, antiword, Word automation). Uploads are processed as
//! asynchronous jobs behind an axum HTTP API, or in parallel from a folder.

pub mod backends;
pub mod config;
pub mod conversion;
pub mod error;
pub mod output;
pub mod processing;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use conversion::{HtmlConverter, TextExtractor};
pub use error::{Error, Result};
pub use processing::{batch_process, convert_document, JobOrchestrator};
pub use types::{ConversionResult, DocumentFormat, JobSnapshot, JobStatus, Settings};
