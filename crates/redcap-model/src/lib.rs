//! Shared types for the REDCap extraction pipeline.
//!
//! - **record**: EAV rows and their transform annotations
//! - **policy**: field-map release policy entries
//! - **transform**: transform records and field descriptors
//! - **dictionary**: REDCap project info and data dictionary rows
//! - **context**: run-scoped state shared across phases
//! - **redact**: switch for logging raw values

pub mod context;
pub mod dictionary;
pub mod enums;
pub mod error;
pub mod policy;
pub mod record;
pub mod redact;
pub mod transform;

pub use context::{MISSING_FROM_FIELD_MAP, RunContext};
pub use dictionary::{DictionaryEntry, ProjectInfo};
pub use enums::{DateGranularity, FieldStatus, OutputMode, TransformMode};
pub use error::{ModelError, Result};
pub use policy::FieldPolicy;
pub use record::{AccessGroupTag, Annotations, DAG_FIELD, Record};
pub use redact::redact_value;
pub use transform::{FieldDescriptor, FieldValue, TransformMetadata, TransformRecord};
