use std::collections::BTreeMap;
use std::fs;

use redcap_core::{
    BatchEmitter, BatchRun, DryRunSink, MemorySink, PipelineError, TransportError,
};
use redcap_model::{
    DictionaryEntry, FieldDescriptor, FieldValue, Record, TransformMetadata, TransformMode,
    TransformRecord,
};

struct Fixture {
    records: Vec<Record>,
    transform_records: Vec<TransformRecord>,
    metadata: Vec<DictionaryEntry>,
    transform_metadata: TransformMetadata,
}

impl Fixture {
    fn new(record_count: usize) -> Self {
        Self {
            records: (0..record_count)
                .map(|i| Record::new(format!("1-{i}"), "screening_arm_1", "np_age", "31"))
                .collect(),
            transform_records: vec![TransformRecord::new(
                "1-4",
                "SecondaryID",
                "secondary_id",
                FieldValue::Integer(100),
            )],
            metadata: vec![DictionaryEntry::new("np_age").with_attribute("field_type", "text")],
            transform_metadata: BTreeMap::from([(
                "SecondaryID".to_string(),
                vec![FieldDescriptor::new(
                    "secondary_id",
                    "Pseudonymous subject identifier",
                )],
            )]),
        }
    }

    fn run(&self) -> BatchRun<'_> {
        BatchRun {
            run_id: "20240301T080000",
            redcap_project_id: 1234,
            redcap_project_type: "MAIN",
            extraction_run_datetime: "2024-03-01T08:00:00.000000",
            records: &self.records,
            transform_records: &self.transform_records,
            metadata_filtered: &self.metadata,
            transform_metadata: &self.transform_metadata,
        }
    }
}

#[test]
fn records_are_split_into_bounded_chunks() {
    let fixture = Fixture::new(7);
    let emitter = BatchEmitter::new(3, true).unwrap();
    let mut sink = MemorySink::new();

    let report = emitter.emit(fixture.run(), &mut sink).unwrap();

    assert_eq!(report.chunks_sent, 3);
    assert_eq!(report.records_sent, 7);
    let sizes: Vec<usize> = sink
        .payloads
        .iter()
        .map(|p| p["redcap_records"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, [3, 3, 1]);
    let numbers: Vec<u64> = sink
        .payloads
        .iter()
        .map(|p| p["chunk_number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, [1, 2, 3]);
}

#[test]
fn only_first_chunk_carries_transform_output() {
    let fixture = Fixture::new(4);
    let emitter = BatchEmitter::new(2, true).unwrap();
    let mut sink = MemorySink::new();
    emitter.emit(fixture.run(), &mut sink).unwrap();

    let first = &sink.payloads[0];
    assert!(first.get("transform_records").is_some());
    assert!(first.get("redcap_metadata_filtered").is_some());
    assert!(first.get("transform_metadata").is_some());

    let second = &sink.payloads[1];
    assert!(second.get("transform_records").is_none());
    assert!(second.get("redcap_metadata_filtered").is_none());
    assert!(second.get("transform_metadata").is_none());
}

#[test]
fn metadata_is_omitted_unless_enabled() {
    let fixture = Fixture::new(1);
    let emitter = BatchEmitter::new(10, false).unwrap();
    let mut sink = MemorySink::new();
    emitter.emit(fixture.run(), &mut sink).unwrap();

    let first = &sink.payloads[0];
    assert!(first.get("transform_records").is_some());
    assert!(first.get("redcap_metadata_filtered").is_none());
    assert!(first.get("transform_metadata").is_none());
}

#[test]
fn empty_run_still_sends_one_chunk() {
    let fixture = Fixture::new(0);
    let emitter = BatchEmitter::new(10, true).unwrap();
    let mut sink = MemorySink::new();

    let report = emitter.emit(fixture.run(), &mut sink).unwrap();

    assert_eq!(report.chunks_sent, 1);
    assert_eq!(sink.payloads.len(), 1);
    assert_eq!(sink.payloads[0]["redcap_records"], serde_json::json!([]));
    assert_eq!(
        sink.payloads[0]["transform_records"][0]["field_value"],
        serde_json::json!(100)
    );
}

#[test]
fn sink_failure_stops_later_chunks() {
    let fixture = Fixture::new(10);
    let emitter = BatchEmitter::new(2, false).unwrap();
    let mut sink = MemorySink::failing_at(3);

    let error = emitter.emit(fixture.run(), &mut sink).unwrap_err();

    assert!(matches!(
        error,
        PipelineError::Transport(TransportError::Status { status: 500, .. })
    ));
    assert_eq!(sink.payloads.len(), 2);
}

#[test]
fn payload_shape() {
    let mut fixture = Fixture::new(0);
    let mut visit = Record::new("1-4", "screening_arm_1", "visit_date", "2020-06-01");
    visit.mark_cleaned("2080-02-01".to_string(), TransformMode::DobShifting, true);
    fixture.records.push(visit);
    fixture.metadata = vec![DictionaryEntry::new("visit_date").with_attribute("field_type", "text")];

    let emitter = BatchEmitter::new(10, true).unwrap();
    let payload = emitter.payloads(fixture.run()).next().unwrap();

    insta::assert_json_snapshot!(payload, @r#"
    {
      "chunk_number": 1,
      "run_id": "20240301T080000",
      "redcap_project_id": 1234,
      "redcap_project_type": "MAIN",
      "extraction_run_datetime": "2024-03-01T08:00:00.000000",
      "redcap_records": [
        {
          "record_id": "1-4",
          "redcap_event_name": "screening_arm_1",
          "redcap_repeat_instrument": "",
          "redcap_repeat_instance": "",
          "field_name": "visit_date",
          "value": "2080-02-01",
          "date_cleaned": true,
          "date_cleaned_type": "dob_shifting"
        }
      ],
      "transform_records": [
        {
          "record_id": "1-4",
          "namespace": "SecondaryID",
          "field_name": "secondary_id",
          "field_value": 100
        }
      ],
      "redcap_metadata_filtered": [
        {
          "field_name": "visit_date",
          "field_type": "text"
        }
      ],
      "transform_metadata": {
        "SecondaryID": [
          {
            "field_name": "secondary_id",
            "description": "Pseudonymous subject identifier"
          }
        ]
      }
    }
    "#);
}

#[test]
fn dry_run_writes_one_line_per_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payloads.jsonl");
    let fixture = Fixture::new(5);
    let emitter = BatchEmitter::new(2, false).unwrap();

    {
        let mut sink = DryRunSink::with_output(&path).unwrap();
        emitter.emit(fixture.run(), &mut sink).unwrap();
    }

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2]["chunk_number"], 3);
    assert!(!contents.contains("original_value"));
}

#[test]
fn dry_run_refuses_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payloads.jsonl");
    fs::write(&path, "").unwrap();

    assert!(matches!(
        DryRunSink::with_output(&path),
        Err(TransportError::Io { .. })
    ));
}
