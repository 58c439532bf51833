use std::collections::BTreeMap;

use redcap_fieldmap::{FieldMap, SecondaryIdMapping, SecondaryIdPool};
use redcap_model::{FieldValue, Record, RunContext};
use redcap_transform::{SecondaryIdTransform, Transform, TransformError};

fn subjects(ids: &[&str]) -> Vec<Record> {
    ids.iter()
        .flat_map(|id| {
            [
                Record::new(*id, "screening_arm_1", "np_age", "31"),
                Record::new(*id, "visit_1_arm_1", "np_age", "32"),
            ]
        })
        .collect()
}

fn issued(result: &redcap_transform::TransformResult) -> Vec<(String, FieldValue)> {
    result
        .transform_records
        .iter()
        .map(|r| (r.record_id.clone(), r.field_value.clone()))
        .collect()
}

#[test]
fn pool_ids_are_issued_in_order() {
    let mut transform = SecondaryIdTransform::from_pool(SecondaryIdPool::new(vec![100, 101, 102]));
    let mut records = subjects(&["1-4", "1-5", "1-6"]);
    let mut ctx = RunContext::new("run");

    let result = transform
        .process(&mut records, &FieldMap::default(), &mut ctx)
        .unwrap();

    assert_eq!(
        issued(&result),
        vec![
            ("1-4".to_string(), FieldValue::Integer(100)),
            ("1-5".to_string(), FieldValue::Integer(101)),
            ("1-6".to_string(), FieldValue::Integer(102)),
        ]
    );
    assert!(result
        .transform_records
        .iter()
        .all(|r| r.namespace == "SecondaryID" && r.field_name == "secondary_id"));
    assert_eq!(ctx.secondary_id("1-5"), Some(101));
}

#[test]
fn fourth_subject_exhausts_pool() {
    let mut transform = SecondaryIdTransform::from_pool(SecondaryIdPool::new(vec![100, 101, 102]));
    let mut records = subjects(&["1-4", "1-5", "1-6", "1-7"]);
    let mut ctx = RunContext::new("run");

    let error = transform
        .process(&mut records, &FieldMap::default(), &mut ctx)
        .unwrap_err();
    assert!(matches!(
        error,
        TransformError::PoolExhausted { ref record_id, pool_size: 3 } if record_id == "1-7"
    ));
}

#[test]
fn assigned_subjects_keep_their_id_across_passes() {
    let mut transform = SecondaryIdTransform::from_pool(SecondaryIdPool::new(vec![100, 101, 102]));
    let mut ctx = RunContext::new("run");

    let mut first = subjects(&["1-5"]);
    transform
        .process(&mut first, &FieldMap::default(), &mut ctx)
        .unwrap();

    let mut second = subjects(&["1-4", "1-5"]);
    let result = transform
        .process(&mut second, &FieldMap::default(), &mut ctx)
        .unwrap();
    assert_eq!(
        issued(&result),
        vec![
            ("1-4".to_string(), FieldValue::Integer(101)),
            ("1-5".to_string(), FieldValue::Integer(100)),
        ]
    );
}

#[test]
fn mapping_supplies_fixed_ids() {
    let mapping = SecondaryIdMapping::new(BTreeMap::from([
        ("1-4".to_string(), 505827),
        ("1-5".to_string(), 434820),
    ]));
    let mut transform = SecondaryIdTransform::from_mapping(mapping);
    let mut records = subjects(&["1-5", "1-4"]);
    let mut ctx = RunContext::new("run");

    let result = transform
        .process(&mut records, &FieldMap::default(), &mut ctx)
        .unwrap();
    assert_eq!(
        issued(&result),
        vec![
            ("1-5".to_string(), FieldValue::Integer(434820)),
            ("1-4".to_string(), FieldValue::Integer(505827)),
        ]
    );
}

#[test]
fn subject_missing_from_mapping_is_fatal() {
    let mapping = SecondaryIdMapping::new(BTreeMap::from([("1-4".to_string(), 505827)]));
    let mut transform = SecondaryIdTransform::from_mapping(mapping);
    let mut records = subjects(&["1-4", "1-9"]);
    let mut ctx = RunContext::new("run");

    let error = transform
        .process(&mut records, &FieldMap::default(), &mut ctx)
        .unwrap_err();
    assert!(matches!(
        error,
        TransformError::MissingSecondaryId { ref record_id } if record_id == "1-9"
    ));
}

#[test]
fn metadata_describes_secondary_id() {
    let transform = SecondaryIdTransform::from_pool(SecondaryIdPool::new(vec![]));
    let metadata = transform.metadata();
    assert_eq!(metadata.len(), 1);
    assert_eq!(metadata[0].field_name, "secondary_id");
}
