use redcap_core::{Decision, PhiFilter};
use redcap_fieldmap::FieldMap;
use redcap_model::{
    AccessGroupTag, FieldPolicy, FieldStatus, MISSING_FROM_FIELD_MAP, Record, RunContext,
    TransformMode,
};

fn field_map() -> FieldMap {
    FieldMap::from_policies([
        FieldPolicy::new("np_age", Some(FieldStatus::Include)),
        FieldPolicy::new("employment", Some(FieldStatus::Include))
            .with_events(["screening_arm_1"]),
        FieldPolicy::new("visit_date", Some(FieldStatus::TransformDate)),
        FieldPolicy::new("np_name", Some(FieldStatus::Exclude)),
        FieldPolicy::new("review_me", Some(FieldStatus::Other("Review".to_string()))),
        FieldPolicy::new("no_status", None),
    ])
}

fn cleaned(mut record: Record) -> Record {
    let value = record.value.clone();
    record.mark_cleaned(value, TransformMode::DateShifting, false);
    record
}

#[test]
fn decisions_follow_field_status() {
    let map = field_map();
    let decide = |record: Record| PhiFilter::decide(&record, &map);

    assert_eq!(
        decide(Record::new("1-4", "visit_1_arm_1", "np_age", "31")),
        Decision::Release
    );
    assert_eq!(
        decide(Record::new("1-4", "screening_arm_1", "employment", "1")),
        Decision::Release
    );
    assert_eq!(
        decide(Record::new("1-4", "visit_1_arm_1", "employment", "1")),
        Decision::RestrictedEvent
    );
    assert_eq!(
        decide(Record::new("1-4", "visit_1_arm_1", "visit_date", "2020-06-01")),
        Decision::UncleanedDate
    );
    assert_eq!(
        decide(cleaned(Record::new("1-4", "visit_1_arm_1", "visit_date", "2080-02-01"))),
        Decision::Release
    );
    assert_eq!(
        decide(Record::new("1-4", "visit_1_arm_1", "np_name", "Jane")),
        Decision::Excluded
    );
    assert_eq!(
        decide(Record::new("1-4", "visit_1_arm_1", "review_me", "x")),
        Decision::Excluded
    );
    assert_eq!(
        decide(Record::new("1-4", "visit_1_arm_1", "no_status", "x")),
        Decision::Excluded
    );
    assert_eq!(
        decide(Record::new("1-4", "visit_1_arm_1", "ghost", "x")),
        Decision::MissingFromFieldMap
    );
}

#[test]
fn access_group_marker_is_always_released() {
    let tag = AccessGroupTag {
        record_id: "1-4".to_string(),
        redcap_event_name: "screening_arm_1".to_string(),
        group: "site_a".to_string(),
    };
    let mut ctx = RunContext::new("run");
    let outcome = PhiFilter::default().filter(
        vec![Record::access_group(&tag)],
        &FieldMap::default(),
        &mut ctx,
    );
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.counts.access_groups, 1);
    assert!(ctx.field_map_errors().is_empty());
    assert!(ctx.unique_fields().contains("redcap_data_access_group"));
}

#[test]
fn included_records_are_released_once_and_unchanged() {
    let records = vec![
        Record::new("1-4", "screening_arm_1", "np_age", "31"),
        Record::new("1-4", "screening_arm_1", "np_name", "Jane"),
        Record::new("1-5", "screening_arm_1", "np_age", "40"),
    ];
    let mut ctx = RunContext::new("run");
    let outcome = PhiFilter::default().filter(records.clone(), &field_map(), &mut ctx);

    assert_eq!(outcome.records, vec![records[0].clone(), records[2].clone()]);
    assert_eq!(outcome.counts.released, 2);
    assert_eq!(outcome.counts.excluded, 1);
    assert_eq!(outcome.counts.dropped(), 1);
}

#[test]
fn uncleaned_dates_are_never_released() {
    let records = vec![
        Record::new("1-4", "screening_arm_1", "visit_date", "2020-06-01"),
        cleaned(Record::new("1-5", "screening_arm_1", "visit_date", "2080-02-01")),
    ];
    let mut ctx = RunContext::new("run");
    let outcome = PhiFilter::default().filter(records, &field_map(), &mut ctx);

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].record_id, "1-5");
    assert_eq!(outcome.counts.uncleaned_date, 1);
}

#[test]
fn missing_field_is_reported_once() {
    let records: Vec<Record> = (0..50)
        .map(|i| Record::new(format!("1-{i}"), "screening_arm_1", "ghost", "x"))
        .collect();
    let mut ctx = RunContext::new("run");
    let outcome = PhiFilter::new(true).filter(records, &field_map(), &mut ctx);

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.counts.missing_from_field_map, 50);
    assert_eq!(ctx.field_map_errors().len(), 1);
    assert_eq!(
        ctx.field_map_errors().get("ghost").map(String::as_str),
        Some(MISSING_FROM_FIELD_MAP)
    );
}

#[test]
fn released_field_names_are_tracked() {
    let records = vec![
        Record::new("1-4", "screening_arm_1", "np_age", "31"),
        Record::new("1-4", "visit_1_arm_1", "employment", "1"),
        Record::new("1-5", "screening_arm_1", "np_age", "40"),
    ];
    let mut ctx = RunContext::new("run");
    PhiFilter::default().filter(records, &field_map(), &mut ctx);

    let released: Vec<&str> = ctx.unique_fields().iter().map(String::as_str).collect();
    assert_eq!(released, ["np_age"]);
}
