//! The record source interface and data-access-group patching.

use redcap_model::{AccessGroupTag, DictionaryEntry, ProjectInfo, Record};

use crate::error::TransportError;

/// Raw extraction output before transforms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub records: Vec<Record>,
    /// Data access group of every consented subject.
    pub access_groups: Vec<AccessGroupTag>,
}

/// Where records come from.
pub trait RecordSource {
    fn project_info(&mut self) -> Result<ProjectInfo, TransportError>;

    /// The project's data dictionary.
    fn metadata(&mut self) -> Result<Vec<DictionaryEntry>, TransportError>;

    /// Records of every consented subject plus their access groups.
    fn extract(&mut self) -> Result<Extraction, TransportError>;
}

/// Appends one data-access-group marker record per tag. Returns the number
/// of records added.
pub fn patch_access_groups(records: &mut Vec<Record>, tags: &[AccessGroupTag]) -> usize {
    records.extend(tags.iter().map(Record::access_group));
    tags.len()
}

/// Serves a fixed extraction. Used for offline runs and tests.
#[derive(Debug, Clone)]
pub struct MemorySource {
    pub project_info: ProjectInfo,
    pub metadata: Vec<DictionaryEntry>,
    pub extraction: Extraction,
}

impl MemorySource {
    pub fn new(project_id: u64, extraction: Extraction) -> Self {
        Self {
            project_info: ProjectInfo {
                project_id,
                project_title: None,
            },
            metadata: Vec::new(),
            extraction,
        }
    }

    pub fn with_metadata(mut self, metadata: Vec<DictionaryEntry>) -> Self {
        self.metadata = metadata;
        self
    }
}

impl RecordSource for MemorySource {
    fn project_info(&mut self) -> Result<ProjectInfo, TransportError> {
        Ok(self.project_info.clone())
    }

    fn metadata(&mut self) -> Result<Vec<DictionaryEntry>, TransportError> {
        Ok(self.metadata.clone())
    }

    fn extract(&mut self) -> Result<Extraction, TransportError> {
        Ok(self.extraction.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redcap_model::DAG_FIELD;

    #[test]
    fn access_groups_become_marker_records() {
        let mut records = vec![Record::new("1-4", "screening_arm_1", "np_age", "31")];
        let tags = vec![AccessGroupTag {
            record_id: "1-4".to_string(),
            redcap_event_name: "screening_arm_1".to_string(),
            group: "site_a".to_string(),
        }];

        assert_eq!(patch_access_groups(&mut records, &tags), 1);
        let marker = &records[1];
        assert_eq!(marker.field_name, DAG_FIELD);
        assert_eq!(marker.value, "site_a");
        assert_eq!(marker.redcap_repeat_instance, "");
        assert!(marker.is_access_group());
    }
}
