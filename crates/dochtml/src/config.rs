//! Configuration for the conversion service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload and output directories
    #[serde(default)]
    pub storage: StorageConfig,
    /// Job lifetime configuration
    #[serde(default)]
    pub jobs: JobsConfig,
    /// External conversion tools
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
    /// Maximum total request size in bytes
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
    /// Maximum size of a single uploaded file in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }
fn default_true() -> bool { true }
fn default_max_upload_size() -> usize { 100 * 1024 * 1024 } // 100MB
fn default_max_file_size() -> usize { 50 * 1024 * 1024 }    // 50MB

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: true,
            max_upload_size: default_max_upload_size(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Where uploads and conversion outputs live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_root")]
    pub upload_root: PathBuf,
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
}

fn default_upload_root() -> PathBuf { PathBuf::from("uploads") }
fn default_output_root() -> PathBuf { PathBuf::from("outputs") }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_root: default_upload_root(),
            output_root: default_output_root(),
        }
    }
}

/// Job eviction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Age after which a job and its files are evicted
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Interval between eviction sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_ttl_secs() -> u64 { 24 * 60 * 60 }
fn default_sweep_interval_secs() -> u64 { 60 * 60 }

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Paths of the external binaries used by the fallback stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_soffice")]
    pub soffice: String,
    #[serde(default = "default_antiword")]
    pub antiword: String,
    #[serde(default = "default_pdftoppm")]
    pub pdftoppm: String,
    #[serde(default = "default_tesseract")]
    pub tesseract: String,
    /// Tesseract language pack
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
    /// PowerShell used for Word automation on Windows
    #[serde(default = "default_powershell")]
    pub powershell: String,
}

fn default_soffice() -> String { "soffice".to_string() }
fn default_antiword() -> String { "antiword".to_string() }
fn default_pdftoppm() -> String { "pdftoppm".to_string() }
fn default_tesseract() -> String { "tesseract".to_string() }
fn default_ocr_language() -> String { "eng".to_string() }
fn default_powershell() -> String { "powershell".to_string() }

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            soffice: default_soffice(),
            antiword: default_antiword(),
            pdftoppm: default_pdftoppm(),
            tesseract: default_tesseract(),
            ocr_language: default_ocr_language(),
            powershell: default_powershell(),
        }
    }
}
