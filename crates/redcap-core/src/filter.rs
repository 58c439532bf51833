//! The PHI filter: one pass over the transformed records, releasing only what
//! the field map allows.

use redcap_fieldmap::FieldMap;
use redcap_model::{FieldStatus, MISSING_FROM_FIELD_MAP, Record, RunContext};
use tracing::{error, info};

/// Outcome of the release decision for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Release,
    /// Field name has no field-map entry.
    MissingFromFieldMap,
    /// `Include` field captured at an event outside its restriction list.
    RestrictedEvent,
    /// `TransformDate*` field no transform has cleaned.
    UncleanedDate,
    /// `Exclude`, unknown, or empty status.
    Excluded,
}

/// Per-decision record counts of one filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCounts {
    pub released: usize,
    /// Released data-access-group marker records (also counted in `released`).
    pub access_groups: usize,
    pub missing_from_field_map: usize,
    pub restricted_event: usize,
    pub uncleaned_date: usize,
    pub excluded: usize,
}

impl FilterCounts {
    fn count(&mut self, decision: Decision) {
        match decision {
            Decision::Release => self.released += 1,
            Decision::MissingFromFieldMap => self.missing_from_field_map += 1,
            Decision::RestrictedEvent => self.restricted_event += 1,
            Decision::UncleanedDate => self.uncleaned_date += 1,
            Decision::Excluded => self.excluded += 1,
        }
    }

    pub fn dropped(&self) -> usize {
        self.missing_from_field_map + self.restricted_event + self.uncleaned_date + self.excluded
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub records: Vec<Record>,
    pub counts: FilterCounts,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PhiFilter {
    log_restricted_events: bool,
}

impl PhiFilter {
    pub fn new(log_restricted_events: bool) -> Self {
        Self {
            log_restricted_events,
        }
    }

    /// Release decision for a single record. Pure; has no logging or context
    /// side effects.
    pub fn decide(record: &Record, field_map: &FieldMap) -> Decision {
        if record.is_access_group() {
            return Decision::Release;
        }
        let Some(policy) = field_map.lookup(&record.field_name) else {
            return Decision::MissingFromFieldMap;
        };
        match &policy.status {
            Some(FieldStatus::Include) => {
                if policy.allows_event(&record.redcap_event_name) {
                    Decision::Release
                } else {
                    Decision::RestrictedEvent
                }
            }
            Some(status) if status.is_transform_date() => {
                if record.is_cleaned() {
                    Decision::Release
                } else {
                    Decision::UncleanedDate
                }
            }
            Some(_) | None => Decision::Excluded,
        }
    }

    /// Filters `records` in order, recording field-map errors and released
    /// field names in `ctx`.
    pub fn filter(
        &self,
        records: Vec<Record>,
        field_map: &FieldMap,
        ctx: &mut RunContext,
    ) -> FilterOutcome {
        let mut counts = FilterCounts::default();
        let mut released = Vec::with_capacity(records.len());

        for record in records {
            let decision = Self::decide(&record, field_map);
            counts.count(decision);
            match decision {
                Decision::Release => {
                    if record.is_access_group() {
                        counts.access_groups += 1;
                    }
                    ctx.mark_released(&record.field_name);
                    released.push(record);
                }
                Decision::MissingFromFieldMap => {
                    if ctx.record_field_map_error(&record.field_name, MISSING_FROM_FIELD_MAP) {
                        error!(field = %record.field_name, "{MISSING_FROM_FIELD_MAP}");
                    }
                }
                Decision::RestrictedEvent => {
                    if self.log_restricted_events {
                        info!(
                            record_id = %record.record_id,
                            field = %record.field_name,
                            event = %record.redcap_event_name,
                            "field not released at this event"
                        );
                    }
                }
                Decision::UncleanedDate | Decision::Excluded => {}
            }
        }

        info!(
            released = counts.released,
            dropped = counts.dropped(),
            missing = counts.missing_from_field_map,
            "filter complete"
        );
        FilterOutcome {
            records: released,
            counts,
        }
    }
}
