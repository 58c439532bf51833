//! Splits the released records into bounded payloads and hands them to a
//! sink.
//!
//! The first chunk also carries the transform records and, when enabled, the
//! filtered dictionary and the transform metadata. Later chunks carry records
//! only. A run without released records still sends one empty chunk so the
//! transform output is delivered exactly once.

use redcap_model::{DictionaryEntry, Record, TransformMetadata, TransformRecord};
use serde::Serialize;
use tracing::{error, info};

use crate::error::{PipelineError, Result};
use crate::sink::BatchSink;

/// Default maximum number of records per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

/// Everything one run delivers, borrowed for the duration of the emission.
#[derive(Debug, Clone, Copy)]
pub struct BatchRun<'a> {
    pub run_id: &'a str,
    pub redcap_project_id: u64,
    pub redcap_project_type: &'a str,
    pub extraction_run_datetime: &'a str,
    pub records: &'a [Record],
    pub transform_records: &'a [TransformRecord],
    pub metadata_filtered: &'a [DictionaryEntry],
    pub transform_metadata: &'a TransformMetadata,
}

/// One chunk as sent to the data lake.
#[derive(Debug, Clone, Serialize)]
pub struct Payload<'a> {
    pub chunk_number: usize,
    pub run_id: &'a str,
    pub redcap_project_id: u64,
    pub redcap_project_type: &'a str,
    pub extraction_run_datetime: &'a str,
    pub redcap_records: &'a [Record],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform_records: Option<&'a [TransformRecord]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redcap_metadata_filtered: Option<&'a [DictionaryEntry]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform_metadata: Option<&'a TransformMetadata>,
}

impl Payload<'_> {
    pub fn is_first(&self) -> bool {
        self.chunk_number == 1
    }
}

/// Totals of a completed emission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    pub chunks_sent: usize,
    pub records_sent: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchEmitter {
    chunk_size: usize,
    include_metadata: bool,
}

impl BatchEmitter {
    pub fn new(chunk_size: usize, include_metadata: bool) -> Result<Self> {
        if chunk_size == 0 {
            return Err(PipelineError::Config(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            chunk_size,
            include_metadata,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn include_metadata(&self) -> bool {
        self.include_metadata
    }

    /// Number of chunks `records` released records will be sent in.
    pub fn chunk_count(&self, records: usize) -> usize {
        records.div_ceil(self.chunk_size).max(1)
    }

    /// Builds the payloads of a run in sending order.
    pub fn payloads<'a>(&self, run: BatchRun<'a>) -> impl Iterator<Item = Payload<'a>> + use<'a> {
        let include_metadata = self.include_metadata;
        let chunks: Vec<&'a [Record]> = if run.records.is_empty() {
            let empty: &'a [Record] = &[];
            vec![empty]
        } else {
            run.records.chunks(self.chunk_size).collect()
        };

        chunks.into_iter().enumerate().map(move |(index, records)| {
            let first = index == 0;
            Payload {
                chunk_number: index + 1,
                run_id: run.run_id,
                redcap_project_id: run.redcap_project_id,
                redcap_project_type: run.redcap_project_type,
                extraction_run_datetime: run.extraction_run_datetime,
                redcap_records: records,
                transform_records: first.then_some(run.transform_records),
                redcap_metadata_filtered: (first && include_metadata)
                    .then_some(run.metadata_filtered),
                transform_metadata: (first && include_metadata)
                    .then_some(run.transform_metadata),
            }
        })
    }

    /// Sends every chunk in order. The first failure aborts the emission.
    pub fn emit(&self, run: BatchRun<'_>, sink: &mut dyn BatchSink) -> Result<EmitReport> {
        let total = self.chunk_count(run.records.len());
        let mut report = EmitReport::default();

        for payload in self.payloads(run) {
            let chunk = payload.chunk_number;
            let records = payload.redcap_records.len();
            if let Err(err) = sink.send(&payload) {
                error!(chunk, total, error = %err, "sending chunk failed, aborting");
                return Err(err.into());
            }
            info!(chunk, total, records, "chunk sent");
            report.chunks_sent += 1;
            report.records_sent += records;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(matches!(
            BatchEmitter::new(0, false),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn chunk_count_rounds_up() {
        let emitter = BatchEmitter::new(3, false).unwrap();
        assert_eq!(emitter.chunk_count(0), 1);
        assert_eq!(emitter.chunk_count(3), 1);
        assert_eq!(emitter.chunk_count(4), 2);
        assert_eq!(emitter.chunk_count(7), 3);
    }
}
