//! Date de-identification for fields marked `TransformDate*` in the field map.
//!
//! Three modes are supported:
//!
//! - `total_seconds`: the value becomes the number of seconds before the
//!   anchor date.
//! - `date_shifting`: every date moves by the same configured number of
//!   seconds.
//! - `dob_shifting`: each subject gets its own whole-day offset that moves
//!   their date of birth onto the anchor date; all of that subject's dates
//!   move by the same offset.
//!
//! In the first two modes an unparsable date stops the run. In
//! `dob_shifting` bad data only drops the affected records.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use redcap_fieldmap::FieldMap;
use redcap_model::{
    DateGranularity, FieldDescriptor, FieldStatus, FieldValue, OutputMode, Record, RunContext,
    TransformMode, TransformRecord, redact_value,
};
use tracing::{debug, error};

use crate::datetime::{dob_offset, format_granularity, parse_datetime, seconds_until, shift};
use crate::error::{Result, TransformError};
use crate::result::{Diagnostic, TransformResult};
use crate::stage::Transform;

pub const NAMESPACE: &str = "DateVars";

/// Field holding the date of birth used by `dob_shifting`.
pub const DEFAULT_DOB_FIELD: &str = "np_dob";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTransformConfig {
    pub mode: TransformMode,
    pub output: OutputMode,
    pub anchor_date: NaiveDate,
    pub shift_seconds: i64,
    pub dob_field: String,
}

impl DateTransformConfig {
    pub fn new(mode: TransformMode, output: OutputMode, anchor_date: NaiveDate) -> Self {
        Self {
            mode,
            output,
            anchor_date,
            shift_seconds: 0,
            dob_field: DEFAULT_DOB_FIELD.to_string(),
        }
    }

    pub fn with_shift_seconds(mut self, shift_seconds: i64) -> Self {
        self.shift_seconds = shift_seconds;
        self
    }

    pub fn with_dob_field(mut self, dob_field: impl Into<String>) -> Self {
        self.dob_field = dob_field.into();
        self
    }
}

#[derive(Debug)]
pub struct DateTransform {
    config: DateTransformConfig,
    anchor: NaiveDateTime,
    shift: Duration,
}

impl DateTransform {
    pub fn new(config: DateTransformConfig) -> Result<Self> {
        let shift = Duration::try_seconds(config.shift_seconds).ok_or_else(|| {
            TransformError::Config(format!(
                "shift_seconds {} is out of range",
                config.shift_seconds
            ))
        })?;
        if config.mode == TransformMode::DateShifting && config.shift_seconds == 0 {
            return Err(TransformError::Config(
                "date_shifting requires a non-zero shift_seconds".to_string(),
            ));
        }
        if config.mode == TransformMode::DobShifting && config.dob_field.trim().is_empty() {
            return Err(TransformError::Config(
                "dob_shifting requires a dob_field".to_string(),
            ));
        }
        Ok(Self {
            anchor: config.anchor_date.and_time(NaiveTime::MIN),
            shift,
            config,
        })
    }

    pub fn config(&self) -> &DateTransformConfig {
        &self.config
    }

    /// Offset per subject whose date of birth parses.
    fn subject_offsets(&self, records: &[Record]) -> BTreeMap<String, Duration> {
        let mut offsets = BTreeMap::new();
        for record in records
            .iter()
            .filter(|r| r.field_name == self.config.dob_field)
        {
            if offsets.contains_key(&record.record_id) {
                continue;
            }
            // A dob cleaned by an earlier pass still has its source value.
            let raw = record
                .annotations
                .original_value
                .as_deref()
                .unwrap_or(&record.value);
            if let Some(dob) = parse_datetime(raw) {
                offsets.insert(
                    record.record_id.clone(),
                    dob_offset(self.config.anchor_date, dob),
                );
            }
        }
        debug!(subjects = offsets.len(), "date of birth offsets computed");
        offsets
    }

    fn parse_required(record: &Record) -> Result<NaiveDateTime> {
        parse_datetime(&record.value).ok_or_else(|| TransformError::DateParse {
            record_id: record.record_id.clone(),
            field_name: record.field_name.clone(),
            value: redact_value(&record.value).to_string(),
            event: record.redcap_event_name.clone(),
        })
    }

    fn shift_required(&self, record: &Record, granularity: DateGranularity) -> Result<String> {
        let value = Self::parse_required(record)?;
        let shifted = shift(value, self.shift).ok_or_else(|| TransformError::DateOutOfRange {
            record_id: record.record_id.clone(),
            field_name: record.field_name.clone(),
        })?;
        Ok(format_granularity(shifted, granularity))
    }

    /// Shifts one record by its subject's offset. Problems are logged and
    /// reported; the record is then skipped.
    fn shift_by_dob(
        &self,
        record: &Record,
        granularity: DateGranularity,
        offsets: &BTreeMap<String, Duration>,
        missing_dob: &mut BTreeSet<String>,
        result: &mut TransformResult,
    ) -> Option<String> {
        let Some(offset) = offsets.get(&record.record_id) else {
            if missing_dob.insert(record.record_id.clone()) {
                error!(
                    record_id = %record.record_id,
                    dob_field = %self.config.dob_field,
                    "missing or unparsable date of birth, skipping subject's dates"
                );
                result.add_diagnostic(
                    Diagnostic::error("missing or unparsable date of birth")
                        .with_record(&record.record_id)
                        .with_field(&self.config.dob_field),
                );
            }
            return None;
        };

        let shifted = parse_datetime(&record.value).and_then(|value| shift(value, *offset));
        if shifted.is_none() {
            error!(
                record_id = %record.record_id,
                field = %record.field_name,
                event = %record.redcap_event_name,
                value = redact_value(&record.value),
                "cannot shift date, skipping record"
            );
            result.add_diagnostic(
                Diagnostic::error("cannot shift date")
                    .with_record(&record.record_id)
                    .with_field(&record.field_name),
            );
        }
        shifted.map(|value| format_granularity(value, granularity))
    }

    fn describe(&self, granularity: DateGranularity) -> String {
        let precision = match granularity {
            DateGranularity::Year => "year",
            DateGranularity::Date => "day",
            DateGranularity::DateTimeMinute => "minute",
            DateGranularity::DateTimeSeconds => "second",
        };
        match self.config.mode {
            TransformMode::TotalSeconds => format!(
                "Whole seconds between the original value (read at {precision} precision) and {}",
                self.config.anchor_date
            ),
            TransformMode::DateShifting => format!(
                "Original value shifted by a fixed offset, reported to the {precision}"
            ),
            TransformMode::DobShifting => format!(
                "Original value shifted by a per-subject offset that moves the date of birth to {}, reported to the {precision}",
                self.config.anchor_date
            ),
        }
    }
}

impl Transform for DateTransform {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn process(
        &mut self,
        records: &mut [Record],
        field_map: &FieldMap,
        _ctx: &mut RunContext,
    ) -> Result<TransformResult> {
        let mode = self.config.mode;
        let offsets = match mode {
            TransformMode::DobShifting => self.subject_offsets(records),
            TransformMode::TotalSeconds | TransformMode::DateShifting => BTreeMap::new(),
        };
        let mut missing_dob = BTreeSet::new();
        let mut result = TransformResult::default();

        for record in records.iter_mut() {
            let Some(granularity) = field_map
                .status(&record.field_name)
                .and_then(FieldStatus::granularity)
            else {
                continue;
            };
            if record.is_cleaned() || record.value.trim().is_empty() {
                continue;
            }
            result.stats.records_scanned += 1;

            let derived = match mode {
                TransformMode::TotalSeconds => {
                    let value = Self::parse_required(record)?;
                    FieldValue::Integer(seconds_until(self.anchor, value))
                }
                TransformMode::DateShifting => {
                    FieldValue::Text(self.shift_required(record, granularity)?)
                }
                TransformMode::DobShifting => {
                    match self.shift_by_dob(
                        record,
                        granularity,
                        &offsets,
                        &mut missing_dob,
                        &mut result,
                    ) {
                        Some(shifted) => FieldValue::Text(shifted),
                        None => {
                            result.stats.records_skipped += 1;
                            continue;
                        }
                    }
                }
            };
            result.stats.records_mutated += 1;

            match self.config.output {
                OutputMode::InPlace => {
                    let keep_original = mode == TransformMode::DobShifting
                        && record.field_name == self.config.dob_field;
                    record.mark_cleaned(derived.to_string(), mode, keep_original);
                }
                OutputMode::SideChannel => result.push_record(
                    TransformRecord::new(
                        record.record_id.clone(),
                        NAMESPACE,
                        record.field_name.clone(),
                        derived,
                    )
                    .with_event(record.redcap_event_name.clone()),
                ),
            }
        }

        Ok(result)
    }

    fn metadata(&self) -> Vec<FieldDescriptor> {
        DateGranularity::ALL
            .into_iter()
            .map(|granularity| {
                FieldDescriptor::new(granularity.as_str(), self.describe(granularity))
                    .with_granularity(granularity)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redcap_model::FieldPolicy;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2050, 1, 1).unwrap()
    }

    fn field_map() -> FieldMap {
        FieldMap::from_policies([
            FieldPolicy::new("np_dob", Some(FieldStatus::TransformDate)),
            FieldPolicy::new("visit_date", Some(FieldStatus::TransformDate)),
            FieldPolicy::new("visit_year", Some(FieldStatus::TransformDateYear)),
            FieldPolicy::new("np_age", Some(FieldStatus::Include)),
        ])
    }

    #[test]
    fn total_seconds_counts_back_from_anchor() {
        let config = DateTransformConfig::new(
            TransformMode::TotalSeconds,
            OutputMode::SideChannel,
            anchor(),
        );
        let mut transform = DateTransform::new(config).unwrap();
        let mut records = vec![Record::new("1-4", "screening_arm_1", "visit_date", "2049-12-31")];
        let mut ctx = RunContext::new("run");

        let result = transform
            .process(&mut records, &field_map(), &mut ctx)
            .unwrap();

        assert_eq!(result.transform_records.len(), 1);
        assert_eq!(
            result.transform_records[0].field_value,
            FieldValue::Integer(86_400)
        );
        assert!(!records[0].is_cleaned());
    }

    #[test]
    fn date_shifting_applies_fixed_offset() {
        let config =
            DateTransformConfig::new(TransformMode::DateShifting, OutputMode::InPlace, anchor())
                .with_shift_seconds(86_400 * 2);
        let mut transform = DateTransform::new(config).unwrap();
        let mut records = vec![
            Record::new("1-4", "screening_arm_1", "visit_year", "2020-12-31"),
            Record::new("1-4", "screening_arm_1", "np_age", "30"),
        ];
        let mut ctx = RunContext::new("run");

        let result = transform
            .process(&mut records, &field_map(), &mut ctx)
            .unwrap();

        assert_eq!(result.stats.records_mutated, 1);
        assert_eq!(records[0].value, "2021");
        assert_eq!(records[0].annotations.original_value, None);
        assert_eq!(records[1].value, "30");
    }

    #[test]
    fn out_of_range_shift_is_a_config_error() {
        let config =
            DateTransformConfig::new(TransformMode::DateShifting, OutputMode::InPlace, anchor())
                .with_shift_seconds(i64::MAX);
        assert!(matches!(
            DateTransform::new(config),
            Err(TransformError::Config(_))
        ));
    }

    #[test]
    fn metadata_describes_every_granularity() {
        let config =
            DateTransformConfig::new(TransformMode::DobShifting, OutputMode::InPlace, anchor());
        let transform = DateTransform::new(config).unwrap();
        let metadata = transform.metadata();
        assert_eq!(metadata.len(), 4);
        assert!(metadata.iter().all(|d| d.granularity.is_some()));
        assert!(metadata[1].description.contains("2050-01-01"));
    }
}
