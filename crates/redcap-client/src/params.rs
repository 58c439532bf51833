//! Form parameters of the REDCap API calls.

/// Ordered `key=value` form fields.
pub type FormParams = Vec<(String, String)>;

fn base(token: &str, content: &str, format: &str) -> FormParams {
    vec![
        ("token".to_string(), token.to_string()),
        ("content".to_string(), content.to_string()),
        ("format".to_string(), format.to_string()),
        ("returnFormat".to_string(), "json".to_string()),
    ]
}

fn push(params: &mut FormParams, key: &str, value: &str) {
    params.push((key.to_string(), value.to_string()));
}

pub fn project(token: &str) -> FormParams {
    base(token, "project", "json")
}

pub fn metadata(token: &str) -> FormParams {
    base(token, "metadata", "json")
}

/// Flat JSON export of the id field at the screening event, with data access
/// groups, restricted by the optional filter logic.
pub fn study_ids(
    token: &str,
    id_field: &str,
    screening_event: &str,
    filter_logic: Option<&str>,
) -> FormParams {
    let mut params = base(token, "record", "json");
    push(&mut params, "type", "flat");
    push(&mut params, "fields[0]", id_field);
    push(&mut params, "events[0]", screening_event);
    push(&mut params, "exportDataAccessGroups", "true");
    if let Some(filter) = filter_logic.filter(|f| !f.trim().is_empty()) {
        push(&mut params, "filterLogic", filter);
    }
    params
}

/// EAV CSV export of the given record ids. The filter logic is not applied
/// here; the id list is already filtered.
pub fn records(token: &str, record_ids: &[String]) -> FormParams {
    let mut params = base(token, "record", "csv");
    push(&mut params, "type", "eav");
    push(&mut params, "rawOrLabel", "raw");
    push(&mut params, "rawOrLabelHeaders", "raw");
    push(&mut params, "exportCheckboxLabel", "true");
    push(&mut params, "exportSurveyFields", "false");
    push(&mut params, "exportDataAccessGroups", "false");
    for (index, record_id) in record_ids.iter().enumerate() {
        push(&mut params, &format!("records[{index}]"), record_id);
    }
    params
}
