use thiserror::Error;

/// Fatal transform failures. Per-record problems that can be skipped are
/// logged and counted instead.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("cannot parse {field_name}={value:?} for record {record_id} ({event}) as a date")]
    DateParse {
        record_id: String,
        field_name: String,
        value: String,
        event: String,
    },

    #[error("shifted value of {field_name} for record {record_id} is out of range")]
    DateOutOfRange {
        record_id: String,
        field_name: String,
    },

    #[error("secondary id pool exhausted at record {record_id} (pool size {pool_size})")]
    PoolExhausted { record_id: String, pool_size: usize },

    #[error("record {record_id} has no secondary id in the mapping file")]
    MissingSecondaryId { record_id: String },

    #[error("transform configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TransformError>;
