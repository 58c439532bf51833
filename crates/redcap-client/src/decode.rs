//! Response decoding for the REDCap record exports.

use std::collections::BTreeMap;

use redcap_model::{AccessGroupTag, Record};
use serde::Deserialize;
use serde_json::Value;

/// One row of an EAV CSV export. REDCap names the id column `record`.
#[derive(Debug, Deserialize)]
struct EavRow {
    #[serde(alias = "record_id")]
    record: String,
    #[serde(default)]
    redcap_event_name: String,
    #[serde(default)]
    redcap_repeat_instrument: String,
    #[serde(default)]
    redcap_repeat_instance: String,
    field_name: String,
    #[serde(default)]
    value: String,
}

impl From<EavRow> for Record {
    fn from(row: EavRow) -> Self {
        Record {
            record_id: row.record,
            redcap_event_name: row.redcap_event_name,
            redcap_repeat_instrument: row.redcap_repeat_instrument,
            redcap_repeat_instance: row.redcap_repeat_instance,
            field_name: row.field_name,
            value: row.value,
            annotations: Default::default(),
        }
    }
}

/// Parses an EAV CSV export into records.
pub fn eav_records(body: &str) -> Result<Vec<Record>, String> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(body.as_bytes());
    reader
        .deserialize::<EavRow>()
        .map(|row| row.map(Record::from).map_err(|e| e.to_string()))
        .collect()
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Extracts the study ids and access groups of a flat id export.
pub fn study_ids(rows: &[BTreeMap<String, Value>], id_field: &str) -> Vec<AccessGroupTag> {
    rows.iter()
        .map(|row| AccessGroupTag {
            record_id: text(row.get(id_field)),
            redcap_event_name: text(row.get("redcap_event_name")),
            group: text(row.get("redcap_data_access_group")),
        })
        .filter(|tag| !tag.record_id.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eav_export_renames_record_column() {
        let body = "record,redcap_event_name,redcap_repeat_instrument,redcap_repeat_instance,field_name,value\n\
                    1-4,screening_arm_1,,,np_age,31\n\
                    1-4,visit_1_arm_1,meds,2,med_name,\"aspirin, 81mg\"\n";
        let records = eav_records(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_id, "1-4");
        assert_eq!(records[0].redcap_repeat_instance, "");
        assert_eq!(records[1].redcap_repeat_instrument, "meds");
        assert_eq!(records[1].value, "aspirin, 81mg");
        assert!(!records[1].is_cleaned());
    }

    #[test]
    fn classic_project_has_no_event_column() {
        let body = "record,field_name,value\n7,np_age,31\n";
        let records = eav_records(body).unwrap();
        assert_eq!(records[0].redcap_event_name, "");
    }

    #[test]
    fn empty_export_has_no_records() {
        assert!(eav_records("").unwrap().is_empty());
    }

    #[test]
    fn malformed_export_is_an_error() {
        assert!(eav_records("record,value\n1-4,31\n").is_err());
    }

    #[test]
    fn study_ids_carry_access_groups() {
        let rows: Vec<BTreeMap<String, Value>> = serde_json::from_str(
            r#"[
                {"study_id": "1-4", "redcap_event_name": "screening_arm_1", "redcap_data_access_group": "site_a"},
                {"study_id": 17, "redcap_event_name": "screening_arm_1", "redcap_data_access_group": ""},
                {"study_id": "", "redcap_event_name": "screening_arm_1"}
            ]"#,
        )
        .unwrap();
        let tags = study_ids(&rows, "study_id");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].group, "site_a");
        assert_eq!(tags[1].record_id, "17");
        assert_eq!(tags[1].group, "");
    }
}
