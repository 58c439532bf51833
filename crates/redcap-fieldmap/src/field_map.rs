//! The field map: per-field release policy loaded once per run.
//!
//! # File format
//!
//! A CSV file with a header row. `field_name` and `status` are required;
//! `restrict_to_event_list`, `form_name`, `exclude_reason`, `notes` and
//! `ontology_term` are read when present. Empty cells are treated as absent.
//! Each field name may appear only once.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use redcap_model::{FieldPolicy, FieldStatus};
use tracing::debug;

use crate::csv_utils::{CsvTable, get_string, split_list};
use crate::error::{FieldMapError, Result};
use crate::hash::sha256_hex;

/// Immutable field-name to policy table.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    entries: BTreeMap<String, FieldPolicy>,
    sha256: String,
}

impl FieldMap {
    /// Loads the field map from a CSV file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| FieldMapError::io(path, e))?;
        Self::from_bytes(&bytes, &path.display().to_string())
    }

    /// Parses field-map CSV content; `origin` names the source in errors.
    pub fn from_bytes(bytes: &[u8], origin: &str) -> Result<Self> {
        let table = CsvTable::parse(bytes, origin)?;
        let idx_field = table.require("field_name", origin)?;
        let idx_status = table.require("status", origin)?;
        let idx_events = table.header_index("restrict_to_event_list");
        let idx_form = table.header_index("form_name");
        let idx_reason = table.header_index("exclude_reason");
        let idx_notes = table.header_index("notes");
        let idx_ontology = table.header_index("ontology_term");

        let mut entries = BTreeMap::new();
        for (row_number, row) in table.rows.iter().enumerate() {
            let field_name =
                get_string(row, Some(idx_field)).ok_or_else(|| FieldMapError::EmptyKey {
                    origin: origin.to_string(),
                    row: row_number + 2,
                    column: "field_name".to_string(),
                })?;
            let status = get_string(row, Some(idx_status))
                .map(|s| s.parse::<FieldStatus>().unwrap_or_else(|never| match never {}));
            let restrict_to_events = get_string(row, idx_events)
                .map(|s| split_list(&s).into_iter().collect::<BTreeSet<_>>())
                .filter(|events| !events.is_empty());

            let policy = FieldPolicy {
                field_name: field_name.clone(),
                status,
                restrict_to_events,
                form_name: get_string(row, idx_form),
                exclude_reason: get_string(row, idx_reason),
                notes: get_string(row, idx_notes),
                ontology_term: get_string(row, idx_ontology),
            };
            if entries.insert(field_name.clone(), policy).is_some() {
                return Err(FieldMapError::DuplicateField {
                    origin: origin.to_string(),
                    field_name,
                });
            }
        }

        debug!(origin, fields = entries.len(), "field map loaded");
        Ok(Self {
            entries,
            sha256: sha256_hex(bytes),
        })
    }

    /// Builds a field map directly from policies (later duplicates replace
    /// earlier ones).
    pub fn from_policies(policies: impl IntoIterator<Item = FieldPolicy>) -> Self {
        let entries = policies
            .into_iter()
            .map(|policy| (policy.field_name.clone(), policy))
            .collect();
        Self {
            entries,
            sha256: String::new(),
        }
    }

    pub fn lookup(&self, field_name: &str) -> Option<&FieldPolicy> {
        self.entries.get(field_name)
    }

    /// Status of a field, `None` when the field is unmapped or has no status.
    pub fn status(&self, field_name: &str) -> Option<&FieldStatus> {
        self.lookup(field_name).and_then(|p| p.status.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldPolicy> {
        self.entries.values()
    }

    /// Hex SHA-256 of the file the map was loaded from (empty when built in
    /// memory).
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Number of fields per status label; unset statuses count as `(none)`.
    pub fn status_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for policy in self.entries.values() {
            let label = policy
                .status
                .as_ref()
                .map_or_else(|| "(none)".to_string(), ToString::to_string);
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }
}
