//! Full HTML documents and their metadata sidecars

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::conversion::escape_html;
use crate::error::Result;
use crate::types::FileStatus;

const BASE_CSS: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif;
            line-height: 1.6;
            color: #333;
            background-color: #f5f5f5;
            padding: 20px;
        }

        .document-container {
            max-width: 850px;
            margin: 0 auto;
            background-color: white;
            box-shadow: 0 0 20px rgba(0,0,0,0.1);
            padding: 40px;
            position: relative;
        }

        @media screen and (max-width: 768px) {
            body { padding: 10px; }
            .document-container { padding: 20px; }
        }

        @media print {
            body { background-color: white; padding: 0; }
            .document-container { box-shadow: none; max-width: 100%; padding: 0; }
        }

        h1 { font-size: 2.5em; margin-bottom: 0.5em; color: #2c3e50; }
        h2 { font-size: 1.8em; margin-top: 1em; margin-bottom: 0.5em; color: #34495e; border-bottom: 2px solid #3498db; padding-bottom: 0.3em; }
        h3 { font-size: 1.4em; margin-top: 0.8em; margin-bottom: 0.4em; color: #34495e; }
        h4 { font-size: 1.2em; margin-top: 0.6em; margin-bottom: 0.3em; color: #34495e; }
        h5, h6 { font-size: 1.1em; margin-top: 0.5em; margin-bottom: 0.3em; color: #34495e; }
        p { margin-bottom: 0.8em; text-align: justify; }
        ul, ol { margin-left: 20px; margin-bottom: 0.8em; }
        li { margin-bottom: 0.3em; }
        blockquote { margin: 0 0 0.8em 1em; padding-left: 1em; border-left: 3px solid #ddd; color: #555; }

        table { width: 100%; border-collapse: collapse; margin-bottom: 1em; }
        th, td { padding: 8px 12px; text-align: left; border-bottom: 1px solid #ddd; }
        th { background-color: #f8f9fa; font-weight: bold; }

        img { max-width: 100%; height: auto; display: block; margin: 1em auto; }
        strong, b { font-weight: 600; color: #2c3e50; }
        em, i { font-style: italic; }
        u { text-decoration: underline; }
        a { color: #3498db; text-decoration: none; }
        a:hover { text-decoration: underline; }

        .pdf-page, .ocr-page { position: relative; }
        .page-break { page-break-after: always; border-top: 1px dashed #ccc; margin: 2em 0; }
        .preserve-space { white-space: pre-wrap; }
"#;

const BASE_JS: &str = r##"
        document.querySelectorAll('a[href^="#"]').forEach(anchor => {
            anchor.addEventListener('click', function (e) {
                e.preventDefault();
                document.querySelector(this.getAttribute('href')).scrollIntoView({ behavior: 'smooth' });
            });
        });

        function printDocument() {
            window.print();
        }
"##;

/// Sidecar written next to every HTML output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub filename: String,
    pub input_path: PathBuf,
    pub timestamp: DateTime<Utc>,
    pub status: FileStatus,
    pub output_path: PathBuf,
    pub html_size: u64,
    pub file_size: u64,
    /// Cascade stage that produced the HTML
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Wraps fragments in the page template
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlAssembler;

impl HtmlAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Complete HTML document around `fragment`
    pub fn render(&self, title: &str, fragment: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{css}    </style>
</head>
<body>
    <div class="document-container">
{fragment}
    </div>
    <script>{js}    </script>
</body>
</html>"#,
            title = escape_html(title),
            css = BASE_CSS,
            fragment = fragment,
            js = BASE_JS,
        )
    }

    /// Write `<stem>.html` and `<stem>_metadata.json` into `output_dir`
    pub fn write(
        &self,
        input: &Path,
        fragment: &str,
        method: Option<&str>,
        output_dir: &Path,
    ) -> Result<DocumentMetadata> {
        let filename = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.clone());

        let html = self.render(&stem, fragment);
        let output_path = output_dir.join(format!("{}.html", stem));
        std::fs::write(&output_path, &html)?;

        let input_path = std::fs::canonicalize(input).unwrap_or_else(|_| input.to_path_buf());
        let file_size = std::fs::metadata(input).map(|m| m.len()).unwrap_or(0);

        let metadata = DocumentMetadata {
            filename,
            input_path,
            timestamp: Utc::now(),
            status: FileStatus::Success,
            output_path,
            html_size: html.len() as u64,
            file_size,
            method: method.map(str::to_string),
        };

        let sidecar = output_dir.join(format!("{}_metadata.json", stem));
        std::fs::write(&sidecar, serde_json::to_string_pretty(&metadata)?)?;

        tracing::debug!("Wrote {} ({} bytes)", metadata.output_path.display(), metadata.html_size);
        Ok(metadata)
    }
}
