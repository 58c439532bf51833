use chrono::NaiveDate;
use redcap_fieldmap::{
    FieldMap, ReferenceSchema, ReferenceSchemaVariant, ReferenceTable, SecondaryIdPool,
};
use redcap_model::{FieldPolicy, FieldStatus, OutputMode, Record, RunContext, TransformMode};
use redcap_transform::{
    CalcVariableTransform, DateTransform, DateTransformConfig, SecondaryIdTransform,
    TransformStage,
};

fn field_map() -> FieldMap {
    FieldMap::from_policies([
        FieldPolicy::new("np_dob", Some(FieldStatus::TransformDate)),
        FieldPolicy::new("visit_date", Some(FieldStatus::TransformDate)),
        FieldPolicy::new("np_age", Some(FieldStatus::Include)),
    ])
}

fn records() -> Vec<Record> {
    vec![
        Record::new("1-4", "screening_arm_1", "np_dob", "1990-05-02"),
        Record::new("1-4", "screening_arm_1", "visit_date", "2020-06-01"),
        Record::new("1-4", "screening_arm_1", "np_age", "31"),
        Record::new("1-5", "screening_arm_1", "np_dob", "1985-01-01"),
        Record::new("1-5", "visit_1_arm_1", "visit_date", "2021-03-04"),
    ]
}

fn stage() -> TransformStage {
    let schema = ReferenceSchema::new(ReferenceSchemaVariant::SecondaryId, ["age_bin"]);
    let table = ReferenceTable::from_bytes(
        b"secondary_id,age_bin\n100,30-34\n101,35-39\n",
        "calc.csv",
        &schema,
    )
    .unwrap();
    let date = DateTransform::new(DateTransformConfig::new(
        TransformMode::DobShifting,
        OutputMode::SideChannel,
        NaiveDate::from_ymd_opt(2050, 1, 1).unwrap(),
    ))
    .unwrap();

    TransformStage::new()
        .with(SecondaryIdTransform::from_pool(SecondaryIdPool::new(vec![100, 101])))
        .with(date)
        .with(CalcVariableTransform::new(table))
}

#[test]
fn runs_transforms_in_order() {
    let mut stage = stage();
    assert_eq!(
        stage.namespaces().collect::<Vec<_>>(),
        ["SecondaryID", "DateVars", "CalcVars"]
    );

    let mut records = records();
    let mut ctx = RunContext::new("run");
    let output = stage.run(&mut records, &field_map(), &mut ctx).unwrap();

    let namespaces: Vec<&str> = output
        .transform_records
        .iter()
        .map(|r| r.namespace.as_str())
        .collect();
    assert_eq!(
        namespaces,
        [
            "SecondaryID",
            "SecondaryID",
            "DateVars",
            "DateVars",
            "DateVars",
            "DateVars",
            "CalcVars",
            "CalcVars",
        ]
    );
    assert_eq!(output.metadata.len(), 3);
    assert_eq!(output.stats.len(), 3);
    assert_eq!(output.error_count, 0);
}

#[test]
fn metadata_is_reported_without_output() {
    let mut stage = stage();
    let mut ctx = RunContext::new("run");
    let output = stage.run(&mut [], &field_map(), &mut ctx).unwrap();

    assert!(output.transform_records.is_empty());
    assert_eq!(output.metadata["SecondaryID"].len(), 1);
    assert_eq!(output.metadata["DateVars"].len(), 4);
    assert_eq!(output.metadata["CalcVars"].len(), 1);
}

#[test]
fn stage_is_idempotent() {
    let mut stage = stage();
    let mut ctx = RunContext::new("run");

    let mut first_records = records();
    let first = stage.run(&mut first_records, &field_map(), &mut ctx).unwrap();
    let mut second_records = records();
    let second = stage.run(&mut second_records, &field_map(), &mut ctx).unwrap();

    assert_eq!(first.transform_records, second.transform_records);
    assert_eq!(first_records, second_records);
}
