//! Run-scoped mutable state shared by the transform stage and the filter.
//!
//! A single [`RunContext`] is created per extraction run and passed by
//! `&mut` to each phase in turn. Nothing here is global, so every test can
//! start from a fresh context.

use std::collections::{BTreeMap, BTreeSet};

/// Reason recorded for fields seen in the data but absent from the field map.
pub const MISSING_FROM_FIELD_MAP: &str = "Missing from field map";

#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Identifier of this run (the extraction timestamp).
    pub run_id: String,
    /// Secondary id assigned to each subject so far.
    secondary_ids: BTreeMap<String, u64>,
    /// Every secondary id issued in this run, for pool de-duplication.
    issued_ids: BTreeSet<u64>,
    /// Subjects already handled, per transform namespace.
    seen: BTreeMap<String, BTreeSet<String>>,
    /// Field-map problems, one entry per field name.
    field_map_errors: BTreeMap<String, String>,
    /// Field names released by the filter.
    unique_fields: BTreeSet<String>,
}

impl RunContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Self::default()
        }
    }

    /// Secondary id already assigned to `record_id`, if any.
    pub fn secondary_id(&self, record_id: &str) -> Option<u64> {
        self.secondary_ids.get(record_id).copied()
    }

    pub fn is_issued(&self, id: u64) -> bool {
        self.issued_ids.contains(&id)
    }

    /// Records an assignment. An existing assignment for the subject wins and
    /// is returned unchanged.
    pub fn assign_secondary_id(&mut self, record_id: &str, id: u64) -> u64 {
        if let Some(existing) = self.secondary_ids.get(record_id) {
            return *existing;
        }
        self.secondary_ids.insert(record_id.to_string(), id);
        self.issued_ids.insert(id);
        id
    }

    pub fn secondary_ids(&self) -> &BTreeMap<String, u64> {
        &self.secondary_ids
    }

    /// Clears the seen set of `namespace` before a new pass over the records.
    pub fn begin_pass(&mut self, namespace: &str) {
        self.seen.entry(namespace.to_string()).or_default().clear();
    }

    /// Marks a subject as seen; returns true the first time only.
    pub fn mark_seen(&mut self, namespace: &str, record_id: &str) -> bool {
        let seen = self.seen.entry(namespace.to_string()).or_default();
        if seen.contains(record_id) {
            return false;
        }
        seen.insert(record_id.to_string());
        true
    }

    /// Records a field-map error; returns true when the field was not yet
    /// reported in this run.
    pub fn record_field_map_error(&mut self, field_name: &str, reason: &str) -> bool {
        if self.field_map_errors.contains_key(field_name) {
            return false;
        }
        self.field_map_errors
            .insert(field_name.to_string(), reason.to_string());
        true
    }

    pub fn field_map_errors(&self) -> &BTreeMap<String, String> {
        &self.field_map_errors
    }

    pub fn mark_released(&mut self, field_name: &str) {
        if !self.unique_fields.contains(field_name) {
            self.unique_fields.insert(field_name.to_string());
        }
    }

    pub fn unique_fields(&self) -> &BTreeSet<String> {
        &self.unique_fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_map_errors_are_recorded_once() {
        let mut ctx = RunContext::new("run");
        assert!(ctx.record_field_map_error("ghost", MISSING_FROM_FIELD_MAP));
        assert!(!ctx.record_field_map_error("ghost", MISSING_FROM_FIELD_MAP));
        assert_eq!(ctx.field_map_errors().len(), 1);
    }

    #[test]
    fn first_assignment_wins() {
        let mut ctx = RunContext::new("run");
        assert_eq!(ctx.assign_secondary_id("1-4", 100), 100);
        assert_eq!(ctx.assign_secondary_id("1-4", 101), 100);
        assert!(ctx.is_issued(100));
        assert!(!ctx.is_issued(101));
    }

    #[test]
    fn begin_pass_resets_seen_subjects() {
        let mut ctx = RunContext::new("run");
        assert!(ctx.mark_seen("CalcVars", "1-4"));
        assert!(!ctx.mark_seen("CalcVars", "1-4"));
        assert!(ctx.mark_seen("SecondaryID", "1-4"));
        ctx.begin_pass("CalcVars");
        assert!(ctx.mark_seen("CalcVars", "1-4"));
    }
}
