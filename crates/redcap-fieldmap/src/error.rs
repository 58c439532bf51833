#![deny(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FieldMapError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {origin}: {message}")]
    Csv { origin: String, message: String },

    #[error("{origin} is missing required column {column:?}")]
    MissingColumn { origin: String, column: String },

    #[error("{origin} row {row}: empty {column}")]
    EmptyKey {
        origin: String,
        row: usize,
        column: String,
    },

    #[error("{origin}: field {field_name:?} appears more than once")]
    DuplicateField { origin: String, field_name: String },

    #[error("reference table {origin} does not match schema: {message}")]
    ReferenceSchema { origin: String, message: String },

    #[error("{origin} row {row}: invalid secondary id {value:?}")]
    InvalidSecondaryId {
        origin: String,
        row: usize,
        value: String,
    },

    #[error("{origin}: secondary id {id} appears more than once")]
    DuplicateSecondaryId { origin: String, id: u64 },

    #[error("pool range starting at {start} with {count} ids overflows")]
    PoolRange { start: u64, count: u64 },
}

impl FieldMapError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(origin: &str, error: &csv::Error) -> Self {
        Self::Csv {
            origin: origin.to_string(),
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FieldMapError>;
