use std::collections::BTreeSet;

use redcap_model::DictionaryEntry;

/// Keeps the dictionary entries of released fields, in dictionary order.
pub fn filter_metadata(
    dictionary: &[DictionaryEntry],
    unique_fields: &BTreeSet<String>,
) -> Vec<DictionaryEntry> {
    dictionary
        .iter()
        .filter(|entry| unique_fields.contains(&entry.field_name))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_released_fields_in_order() {
        let dictionary = vec![
            DictionaryEntry::new("study_id").with_attribute("field_type", "text"),
            DictionaryEntry::new("np_name").with_attribute("identifier", "y"),
            DictionaryEntry::new("np_age").with_attribute("field_type", "text"),
        ];
        let released = BTreeSet::from(["np_age".to_string(), "study_id".to_string()]);

        let filtered = filter_metadata(&dictionary, &released);
        let names: Vec<&str> = filtered.iter().map(|e| e.field_name.as_str()).collect();
        assert_eq!(names, ["study_id", "np_age"]);
        assert_eq!(filtered[0].attributes["field_type"], "text");
    }
}
