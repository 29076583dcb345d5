use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the archive pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,

    pub parsing: ParsingConfig,

    pub ai: AiConfig,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Root directory of the media store holding uploaded binaries.
    pub media_root: PathBuf,

    /// SQLite database file.
    pub database_path: PathBuf,

    /// Worker threads for the job queue. Defaults to the CPU count.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Config {
    /// Worker threads to start, defaulting to the CPU count.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Paths and settings for the external extraction tools.
///
/// Binaries are configured by absolute path, not discovered on PATH.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    pub tesseract_path: PathBuf,
    pub pdftotext_path: PathBuf,
    pub pdftoppm_path: PathBuf,

    /// Shared working directory for OCR temp files. Created if absent.
    pub temp_directory: PathBuf,

    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,

    /// Rasterization resolution for scanned-PDF fallback.
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

/// Gemini API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub api_key: String,

    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Per-request timeout for AI/embedding HTTP calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Pipeline-wide retry and classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Minimum confidence (0-100) for auto-classification.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Total attempts per stage job, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delays between attempts, in seconds.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: Vec<u64>,

    /// Hard wall-clock timeout per attempt, in seconds. Large scanned
    /// PDFs can take minutes to rasterize and OCR.
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_ai_endpoint(),
            generation_model: default_generation_model(),
            embedding_model: default_embedding_model(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
            stage_timeout_secs: default_stage_timeout_secs(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_dpi() -> u32 {
    300
}

fn default_ai_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_generation_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_confidence_threshold() -> f64 {
    85.0
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_secs() -> Vec<u64> {
    vec![30, 60, 120]
}

fn default_stage_timeout_secs() -> u64 {
    300
}
