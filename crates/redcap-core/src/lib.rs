//! Filtering, batching, and the run driver of the REDCap ETL.
//!
//! - **filter**: the field-map driven PHI filter
//! - **metadata**: dictionary filtering by released fields
//! - **batch**: chunked payloads and emission
//! - **sink** / **source**: delivery and extraction interfaces
//! - **pipeline**: the run driver

pub mod batch;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod pipeline;
pub mod sink;
pub mod source;

pub use batch::{BatchEmitter, BatchRun, DEFAULT_CHUNK_SIZE, EmitReport, Payload};
pub use error::{PipelineError, Result, TransportError};
pub use filter::{Decision, FilterCounts, FilterOutcome, PhiFilter};
pub use metadata::filter_metadata;
pub use pipeline::{EtlRun, ProjectSettings, RUN_DATETIME_FORMAT, RunReport};
pub use sink::{BatchSink, DryRunSink, MemorySink};
pub use source::{Extraction, MemorySource, RecordSource, patch_access_groups};
