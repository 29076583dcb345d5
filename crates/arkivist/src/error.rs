use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArkivistError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Parse(#[from] ParseError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("AI provider error: {0}")]
    Ai(#[from] AiError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Errors raised by text-extraction parsers and the parser registry.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("No parser available for extension: .{0}")]
    UnsupportedFormat(String),

    #[error("External tool failure: {0}")]
    ExternalToolFailure(String),

    #[error("Failed to parse document: {0}")]
    ParseFailure(String),

    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the generative-AI and embedding clients.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Connection to AI provider failed: {0}")]
    Connection(String),

    #[error("AI provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse AI response: {0}")]
    Parse(String),

    #[error("AI provider API key is not configured")]
    MissingApiKey,
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Job failed: {0}")]
    JobFailed(String),
}

pub type Result<T> = std::result::Result<T, ArkivistError>;
