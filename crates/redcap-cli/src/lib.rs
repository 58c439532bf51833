//! Library side of the `redcap-etl` binary: configuration and logging.

pub mod config;
pub mod logging;
