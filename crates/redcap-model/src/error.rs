use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid transform mode {0:?} (expected total_seconds, date_shifting or dob_shifting)")]
    InvalidTransformMode(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
