use std::path::PathBuf;
use thiserror::Error;

/// Failures loading or validating the model metadata bundle. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read metadata {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse metadata {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported metadata format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("metadata has no {0}")]
    Empty(&'static str),

    #[error("duplicate {kind} '{name}' in metadata")]
    Duplicate { kind: &'static str, name: String },

    #[error("invalid scaler: {0}")]
    Scaler(#[from] TransformError),
}

/// Failures applying a fitted transform to one row. Recoverable per sample.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    #[error("shape mismatch: transform fitted for {expected} columns, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("non-finite value in column {0} after scaling")]
    NonFinite(usize),
}
