//! EAV record rows and their transform annotations.

use serde::{Deserialize, Serialize};

use crate::enums::TransformMode;

/// Field name of the synthetic data-access-group record patched into the
/// record stream after extraction. Always released.
pub const DAG_FIELD: &str = "redcap_data_access_group";

/// One `(record_id, event, field_name) -> value` row of an EAV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub record_id: String,
    pub redcap_event_name: String,
    #[serde(default)]
    pub redcap_repeat_instrument: String,
    #[serde(default)]
    pub redcap_repeat_instance: String,
    pub field_name: String,
    pub value: String,
    #[serde(flatten)]
    pub annotations: Annotations,
}

/// Annotations written by in-place transforms and read by the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    /// Set once a transform has replaced the value with a releasable one.
    #[serde(rename = "date_cleaned", default, skip_serializing_if = "is_false")]
    pub cleaned: bool,
    #[serde(
        rename = "date_cleaned_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cleaned_type: Option<TransformMode>,
    /// Pre-transform value kept for audit. Never serialized.
    #[serde(skip)]
    pub original_value: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Record {
    pub fn new(
        record_id: impl Into<String>,
        event: impl Into<String>,
        field_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            redcap_event_name: event.into(),
            redcap_repeat_instrument: String::new(),
            redcap_repeat_instance: String::new(),
            field_name: field_name.into(),
            value: value.into(),
            annotations: Annotations::default(),
        }
    }

    /// Builds the data-access-group marker record for a subject.
    pub fn access_group(tag: &AccessGroupTag) -> Self {
        Self::new(
            tag.record_id.clone(),
            tag.redcap_event_name.clone(),
            DAG_FIELD,
            tag.group.clone(),
        )
    }

    pub fn is_access_group(&self) -> bool {
        self.field_name == DAG_FIELD
    }

    pub fn is_cleaned(&self) -> bool {
        self.annotations.cleaned
    }

    /// Replaces the value with a transformed one and marks it cleaned.
    ///
    /// When `keep_original` is set the previous value is preserved in
    /// [`Annotations::original_value`].
    pub fn mark_cleaned(&mut self, value: String, mode: TransformMode, keep_original: bool) {
        let previous = std::mem::replace(&mut self.value, value);
        if keep_original {
            self.annotations.original_value = Some(previous);
        }
        self.annotations.cleaned = true;
        self.annotations.cleaned_type = Some(mode);
    }
}

/// Per-subject data access group reported alongside the record ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGroupTag {
    pub record_id: String,
    pub redcap_event_name: String,
    pub group: String,
}
