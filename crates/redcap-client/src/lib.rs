//! Blocking HTTP collaborators of the REDCap ETL.
//!
//! - [`RedcapSource`]: project info, data dictionary, and EAV record export
//! - [`DatalakeSink`]: one JSON POST per payload

mod decode;
pub mod datalake;
mod params;
pub mod redcap;

pub use datalake::DatalakeSink;
pub use redcap::{DEFAULT_RECORD_CHUNK_SIZE, RedcapSettings, RedcapSource};
