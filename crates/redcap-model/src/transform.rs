//! Derived values produced by transforms, and the metadata describing them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::enums::DateGranularity;

/// A derived field value. Serialized untagged, so integers stay numeric in
/// the emitted JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// A derived `(record_id, namespace, field_name, field_value)` tuple.
///
/// Kept apart from raw records; the namespace keeps field names of different
/// transforms from colliding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRecord {
    pub record_id: String,
    pub namespace: String,
    pub field_name: String,
    pub field_value: FieldValue,
    /// Source event, set when the derived value belongs to one event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redcap_event_name: Option<String>,
}

impl TransformRecord {
    pub fn new(
        record_id: impl Into<String>,
        namespace: impl Into<String>,
        field_name: impl Into<String>,
        field_value: impl Into<FieldValue>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            namespace: namespace.into(),
            field_name: field_name.into(),
            field_value: field_value.into(),
            redcap_event_name: None,
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.redcap_event_name = Some(event.into());
        self
    }
}

/// Description of one field a transform can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub field_name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<DateGranularity>,
}

impl FieldDescriptor {
    pub fn new(field_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            description: description.into(),
            granularity: None,
        }
    }

    pub fn with_granularity(mut self, granularity: DateGranularity) -> Self {
        self.granularity = Some(granularity);
        self
    }
}

/// Transform metadata keyed by namespace.
pub type TransformMetadata = BTreeMap<String, Vec<FieldDescriptor>>;
