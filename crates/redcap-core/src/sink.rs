//! Destinations for emitted payloads.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::batch::Payload;
use crate::error::TransportError;

/// Receives payloads in chunk order. An error stops the emission.
pub trait BatchSink {
    fn send(&mut self, payload: &Payload<'_>) -> Result<(), TransportError>;
}

/// Sends nothing. Logs payload sizes and optionally writes each payload as
/// one JSON line to a new file.
#[derive(Debug, Default)]
pub struct DryRunSink {
    output: Option<(PathBuf, BufWriter<File>)>,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes payloads to `path`, which must not exist yet.
    pub fn with_output(path: &Path) -> Result<Self, TransportError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|source| TransportError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), "writing payloads to file");
        Ok(Self {
            output: Some((path.to_path_buf(), BufWriter::new(file))),
        })
    }
}

impl BatchSink for DryRunSink {
    fn send(&mut self, payload: &Payload<'_>) -> Result<(), TransportError> {
        let body = serde_json::to_vec(payload)?;
        let transform_bytes = match payload.transform_records {
            Some(records) => serde_json::to_vec(records)?.len(),
            None => 0,
        };
        let metadata_bytes = match payload.redcap_metadata_filtered {
            Some(entries) => serde_json::to_vec(entries)?.len(),
            None => 0,
        };
        info!(
            chunk = payload.chunk_number,
            records = payload.redcap_records.len(),
            payload_bytes = body.len(),
            transform_bytes,
            metadata_bytes,
            "dry run: payload not sent"
        );

        if let Some((path, writer)) = &mut self.output {
            let io_error = |source: std::io::Error| TransportError::Io {
                path: path.clone(),
                source,
            };
            writer.write_all(&body).map_err(io_error)?;
            writer.write_all(b"\n").map_err(io_error)?;
            writer.flush().map_err(io_error)?;
        }
        Ok(())
    }
}

/// Keeps every payload as a JSON value.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub payloads: Vec<serde_json::Value>,
    fail_at_chunk: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the given chunk number with an HTTP 500.
    pub fn failing_at(chunk_number: usize) -> Self {
        Self {
            payloads: Vec::new(),
            fail_at_chunk: Some(chunk_number),
        }
    }
}

impl BatchSink for MemorySink {
    fn send(&mut self, payload: &Payload<'_>) -> Result<(), TransportError> {
        if self.fail_at_chunk == Some(payload.chunk_number) {
            return Err(TransportError::Status {
                url: "memory://sink".to_string(),
                status: 500,
                body: format!("chunk {} rejected", payload.chunk_number),
            });
        }
        self.payloads.push(serde_json::to_value(payload)?);
        Ok(())
    }
}
