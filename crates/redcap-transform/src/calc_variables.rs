//! Calculated variables joined from a de-identified reference table.

use std::collections::BTreeMap;

use redcap_fieldmap::{FieldMap, ReferenceSchemaVariant, ReferenceTable};
use redcap_model::{FieldDescriptor, Record, RunContext, TransformRecord};
use tracing::{debug, error};

use crate::error::Result;
use crate::result::{Diagnostic, TransformResult};
use crate::stage::Transform;

pub const NAMESPACE: &str = "CalcVars";

const DEFAULT_DESCRIPTION: &str = "Calculated variable from the reference table";

/// Emits one transform record per non-blank reference column for every
/// subject, once per pass.
#[derive(Debug, Clone)]
pub struct CalcVariableTransform {
    table: ReferenceTable,
    descriptions: BTreeMap<String, String>,
}

impl CalcVariableTransform {
    pub fn new(table: ReferenceTable) -> Self {
        Self {
            table,
            descriptions: BTreeMap::new(),
        }
    }

    /// Per-column descriptions reported in the transform metadata.
    pub fn with_descriptions(mut self, descriptions: BTreeMap<String, String>) -> Self {
        self.descriptions = descriptions;
        self
    }

    /// Reference-table key for a subject, `None` when it cannot be derived.
    fn join_key(&self, record_id: &str, ctx: &RunContext) -> Option<String> {
        match self.table.variant() {
            ReferenceSchemaVariant::StudyId => Some(record_id.to_string()),
            ReferenceSchemaVariant::SecondaryId => {
                ctx.secondary_id(record_id).map(|id| id.to_string())
            }
        }
    }
}

impl Transform for CalcVariableTransform {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn process(
        &mut self,
        records: &mut [Record],
        _field_map: &FieldMap,
        ctx: &mut RunContext,
    ) -> Result<TransformResult> {
        let mut result = TransformResult::default();
        ctx.begin_pass(NAMESPACE);

        for record in records.iter() {
            if !ctx.mark_seen(NAMESPACE, &record.record_id) {
                continue;
            }
            result.stats.records_scanned += 1;

            let Some(key) = self.join_key(&record.record_id, ctx) else {
                error!(record_id = %record.record_id, "no secondary id assigned, skipping calculated variables");
                result.add_diagnostic(
                    Diagnostic::error("no secondary id assigned").with_record(&record.record_id),
                );
                result.stats.records_skipped += 1;
                continue;
            };
            let Some(row) = self.table.row(&key) else {
                debug!(record_id = %record.record_id, "no reference row");
                result.add_diagnostic(
                    Diagnostic::warning("no reference row").with_record(&record.record_id),
                );
                result.stats.records_skipped += 1;
                continue;
            };

            for (column, value) in row {
                result.push_record(TransformRecord::new(
                    record.record_id.clone(),
                    NAMESPACE,
                    column,
                    value,
                ));
            }
            result.stats.records_mutated += 1;
        }

        Ok(result)
    }

    fn metadata(&self) -> Vec<FieldDescriptor> {
        self.table
            .columns()
            .iter()
            .map(|column| {
                let description = self
                    .descriptions
                    .get(column)
                    .map_or(DEFAULT_DESCRIPTION, String::as_str);
                FieldDescriptor::new(column.clone(), description)
            })
            .collect()
    }
}
