//! Stable pseudonymous ids per subject.
//!
//! Ids come either from a fixed mapping file or from a pre-shuffled pool.
//! Assignments are cached in the [`RunContext`], so a subject keeps its id for
//! the rest of the run and later transforms can join on it.

use redcap_fieldmap::{FieldMap, SecondaryIdMapping, SecondaryIdPool};
use redcap_model::{FieldDescriptor, FieldValue, Record, RunContext, TransformRecord};
use tracing::debug;

use crate::error::{Result, TransformError};
use crate::result::TransformResult;
use crate::stage::Transform;

pub const NAMESPACE: &str = "SecondaryID";

/// Transform field carrying the assigned id.
pub const FIELD_NAME: &str = "secondary_id";

#[derive(Debug, Clone)]
pub enum SecondaryIdSource {
    /// Fixed `record_id -> id` assignments; unknown subjects are fatal.
    Mapping(SecondaryIdMapping),
    /// Ordered pool; each new subject takes the next unissued id.
    Pool(SecondaryIdPool),
}

#[derive(Debug, Clone)]
pub struct SecondaryIdTransform {
    source: SecondaryIdSource,
}

impl SecondaryIdTransform {
    pub fn new(source: SecondaryIdSource) -> Self {
        Self { source }
    }

    pub fn from_mapping(mapping: SecondaryIdMapping) -> Self {
        Self::new(SecondaryIdSource::Mapping(mapping))
    }

    pub fn from_pool(pool: SecondaryIdPool) -> Self {
        Self::new(SecondaryIdSource::Pool(pool))
    }

    fn assign(&self, record_id: &str, cursor: &mut usize, ctx: &mut RunContext) -> Result<u64> {
        if let Some(id) = ctx.secondary_id(record_id) {
            return Ok(id);
        }
        let id = match &self.source {
            SecondaryIdSource::Mapping(mapping) => {
                mapping
                    .get(record_id)
                    .ok_or_else(|| TransformError::MissingSecondaryId {
                        record_id: record_id.to_string(),
                    })?
            }
            SecondaryIdSource::Pool(pool) => {
                let ids = pool.ids();
                while *cursor < ids.len() && ctx.is_issued(ids[*cursor]) {
                    *cursor += 1;
                }
                let id = ids
                    .get(*cursor)
                    .copied()
                    .ok_or_else(|| TransformError::PoolExhausted {
                        record_id: record_id.to_string(),
                        pool_size: ids.len(),
                    })?;
                *cursor += 1;
                id
            }
        };
        debug!(record_id, "secondary id assigned");
        Ok(ctx.assign_secondary_id(record_id, id))
    }
}

impl Transform for SecondaryIdTransform {
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
        let mut cursor = 0;
        ctx.begin_pass(NAMESPACE);

        for record in records.iter() {
            if !ctx.mark_seen(NAMESPACE, &record.record_id) {
                continue;
            }
            result.stats.records_scanned += 1;
            let id = self.assign(&record.record_id, &mut cursor, ctx)?;
            let value = i64::try_from(id).map_err(|_| {
                TransformError::Config(format!("secondary id {id} does not fit a signed integer"))
            })?;
            result.push_record(TransformRecord::new(
                record.record_id.clone(),
                NAMESPACE,
                FIELD_NAME,
                FieldValue::Integer(value),
            ));
            result.stats.records_mutated += 1;
        }

        Ok(result)
    }

    fn metadata(&self) -> Vec<FieldDescriptor> {
        vec![FieldDescriptor::new(
            FIELD_NAME,
            "Pseudonymous subject identifier, stable across runs",
        )]
    }
}
