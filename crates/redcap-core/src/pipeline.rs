//! Run driver with explicit stages.
//!
//! The stages run in this order:
//! 1. **Validate source**: the REDCap project id must match the configuration
//! 2. **Extract**: dictionary (when metadata is delivered), records, access groups
//! 3. **Transform**: the ordered transform stage
//! 4. **Filter**: the PHI filter and the dictionary filter
//! 5. **Emit**: chunked delivery to the sink
//!
//! Transforms always run before the filter, so date fields can only be
//! released once cleaned.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use redcap_fieldmap::FieldMap;
use redcap_model::RunContext;
use redcap_transform::{TransformStage, TransformStats};
use tracing::{info, info_span};

use crate::batch::{BatchEmitter, BatchRun, EmitReport};
use crate::error::{PipelineError, Result};
use crate::filter::{FilterCounts, PhiFilter};
use crate::metadata::filter_metadata;
use crate::sink::BatchSink;
use crate::source::{RecordSource, patch_access_groups};

/// Format of `extraction_run_datetime` in payloads.
pub const RUN_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Static description of the project being extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSettings {
    /// Project id REDCap must report.
    pub project_id: u64,
    /// Free-text project type forwarded in every payload.
    pub project_type: String,
}

/// Everything needed to run one extraction.
pub struct EtlRun<'a> {
    pub project: ProjectSettings,
    pub field_map: &'a FieldMap,
    pub stage: TransformStage,
    pub filter: PhiFilter,
    pub emitter: BatchEmitter,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub run_id: String,
    pub records_extracted: usize,
    pub access_groups: usize,
    pub transform_stats: Vec<(String, TransformStats)>,
    pub transform_records: usize,
    pub transform_errors: usize,
    pub filter: FilterCounts,
    pub unique_fields: usize,
    pub metadata_entries: usize,
    pub emit: EmitReport,
    /// Field-map problems, one entry per field name.
    pub field_map_errors: BTreeMap<String, String>,
}

impl EtlRun<'_> {
    /// Runs every stage to completion. Any error aborts the run; chunks
    /// already sent stay sent.
    pub fn execute(
        &mut self,
        source: &mut dyn RecordSource,
        sink: &mut dyn BatchSink,
        ctx: &mut RunContext,
        started_at: NaiveDateTime,
    ) -> Result<RunReport> {
        let span = info_span!("run", run_id = %ctx.run_id);
        let _guard = span.enter();
        let extraction_run_datetime = started_at.format(RUN_DATETIME_FORMAT).to_string();

        let project_info = source.project_info()?;
        if project_info.project_id != self.project.project_id {
            return Err(PipelineError::ProjectMismatch {
                expected: self.project.project_id,
                actual: project_info.project_id,
            });
        }
        info!(
            project_id = project_info.project_id,
            title = project_info.project_title.as_deref().unwrap_or(""),
            "project validated"
        );

        let dictionary = if self.emitter.include_metadata() {
            source.metadata()?
        } else {
            Vec::new()
        };

        let extraction = source.extract()?;
        let mut records = extraction.records;
        let records_extracted = records.len();
        let access_groups = patch_access_groups(&mut records, &extraction.access_groups);
        info!(
            records = records_extracted,
            access_groups, "extraction complete"
        );

        let stage_output = self.stage.run(&mut records, self.field_map, ctx)?;
        let outcome = self.filter.filter(records, self.field_map, ctx);
        let metadata_filtered = filter_metadata(&dictionary, ctx.unique_fields());

        let emit = self.emitter.emit(
            BatchRun {
                run_id: &ctx.run_id,
                redcap_project_id: project_info.project_id,
                redcap_project_type: &self.project.project_type,
                extraction_run_datetime: &extraction_run_datetime,
                records: &outcome.records,
                transform_records: &stage_output.transform_records,
                metadata_filtered: &metadata_filtered,
                transform_metadata: &stage_output.metadata,
            },
            sink,
        )?;

        Ok(RunReport {
            run_id: ctx.run_id.clone(),
            records_extracted,
            access_groups,
            transform_records: stage_output.transform_records.len(),
            transform_errors: stage_output.error_count,
            transform_stats: stage_output.stats,
            filter: outcome.counts,
            unique_fields: ctx.unique_fields().len(),
            metadata_entries: metadata_filtered.len(),
            emit,
            field_map_errors: ctx.field_map_errors().clone(),
        })
    }
}
