use std::path::PathBuf;

use redcap_transform::TransformError;
use thiserror::Error;

/// Failures talking to REDCap, the data lake, or a payload file.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("cannot decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("cannot encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("REDCap project id mismatch: expected {expected}, actual {actual}")]
    ProjectMismatch { expected: u64, actual: u64 },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
