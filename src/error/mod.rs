//! Error handling for schema loading, generation and dataset I/O.

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

pub mod util;

/// Specialized error type for the crate
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    /// Error opening, reading or writing a file
    #[error("IO error{}: {source}", display_path(.path))]
    Io {
        source: io::Error,
        path: Option<PathBuf>,
    },

    /// Malformed JSON (schema files, list fields, requests)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error writing CSV output
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error building or reading Arrow record batches
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error converting records to or from Arrow via `serde_arrow`
    #[error("Arrow conversion error: {0}")]
    ArrowConversion(#[from] serde_arrow::Error),

    /// Error writing or reading Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// The schema is structurally unusable (strict mode, or unreadable content)
    #[error("Schema error: {0}")]
    Schema(String),

    /// A dataset file does not have the expected layout
    #[error("Dataset format error at line {line}: {message}")]
    DatasetFormat { line: usize, message: String },

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Training could not run on the given data
    #[error("Training error: {0}")]
    Training(String),
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

impl From<io::Error> for SynthError {
    fn from(error: io::Error) -> Self {
        Self::Io {
            source: error,
            path: None,
        }
    }
}

impl SynthError {
    /// Wrap an IO error together with the path it happened on
    pub fn io_with_path(source: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    pub fn dataset_format(line: usize, message: impl Into<String>) -> Self {
        Self::DatasetFormat {
            line,
            message: message.into(),
        }
    }
}

/// Result type for crate operations
pub type Result<T> = std::result::Result<T, SynthError>;
