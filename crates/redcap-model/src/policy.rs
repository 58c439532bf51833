//! Field-map policy entries.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::enums::FieldStatus;

/// Release policy for a single field, one row of the field map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPolicy {
    pub field_name: String,
    /// `None` when the status cell was empty; such fields are withheld.
    pub status: Option<FieldStatus>,
    /// When present, `Include` applies only to these events.
    pub restrict_to_events: Option<BTreeSet<String>>,
    pub form_name: Option<String>,
    pub exclude_reason: Option<String>,
    pub notes: Option<String>,
    pub ontology_term: Option<String>,
}

impl FieldPolicy {
    pub fn new(field_name: impl Into<String>, status: Option<FieldStatus>) -> Self {
        Self {
            field_name: field_name.into(),
            status,
            restrict_to_events: None,
            form_name: None,
            exclude_reason: None,
            notes: None,
            ontology_term: None,
        }
    }

    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restrict_to_events = Some(events.into_iter().map(Into::into).collect());
        self
    }

    /// True when no event restriction applies or `event` is listed.
    pub fn allows_event(&self, event: &str) -> bool {
        self.restrict_to_events
            .as_ref()
            .is_none_or(|events| events.contains(event))
    }

    pub fn is_transform_date(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(FieldStatus::is_transform_date)
    }
}
