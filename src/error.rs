use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when invoking an external metric analyzer
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Analyzer failed: {0}")]
    Failed(String),

    #[error("Analyzer timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid analyzer report: {0}")]
    InvalidReport(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur while discovering or subscribing to watched files
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to watch {path}: {reason}")]
    SetupFailed { path: PathBuf, reason: String },

    #[error("Failed to scan directory {path}: {reason}")]
    DirectoryScan { path: PathBuf, reason: String },

    #[error("Notification backend error: {0}")]
    Backend(#[from] notify::Error),
}

/// Errors that can occur when exporting dashboard or metric data
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML serialization failed: {0}")]
    Xml(String),
}

/// Errors surfaced by the monitor control surface
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Monitor coordinator is no longer running")]
    ChannelClosed,

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Invalid threshold for {name}: {reason}")]
    InvalidThreshold { name: String, reason: String },
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
