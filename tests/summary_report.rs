mod common;

use common::{alice, csv_upload, memory_pipeline};
use equipment_ingest::ingestion::UploadFile;
use equipment_ingest::processing::Metric;
use equipment_ingest::report::REPORT_SAMPLE_ROWS;
use equipment_ingest::types::Identity;

fn fixture_upload() -> UploadFile {
    UploadFile::new("equipment.csv", std::fs::read("tests/fixtures/equipment.csv").unwrap())
        .with_name("Plant A")
}

#[test]
fn summary_of_fixture_dataset() {
    let (_blobs, _store, pipeline) = memory_pipeline(5);
    let ds = pipeline
        .upload(&Identity::from(alice()), &fixture_upload())
        .unwrap()
        .dataset;

    let summary = pipeline.summary(&alice(), ds.id).unwrap();
    assert_eq!(summary.dataset_id, ds.id);
    assert_eq!(summary.dataset_name, "Plant A");
    assert_eq!(summary.uploaded_at, ds.uploaded_at);
    assert_eq!(summary.total_count, 8);

    let flow = summary.statistics.get(Metric::Flowrate);
    assert_eq!(flow.average, 116.38);
    assert_eq!(flow.min, 60.0);
    assert_eq!(flow.max, 170.0);

    let temp = summary.statistics.get(Metric::Temperature);
    assert_eq!(temp.average, 115.69);
    assert_eq!(temp.min, 95.0);
    assert_eq!(temp.max, 150.0);

    let pressure = summary.statistics.get(Metric::Pressure);
    assert!((pressure.min - 4.1).abs() < 1e-9);
    assert!((pressure.max - 8.4).abs() < 1e-9);

    let shares: Vec<(&str, usize, f64)> = summary
        .type_distribution
        .iter()
        .map(|s| (s.equipment_type.as_str(), s.count, s.percentage))
        .collect();
    assert_eq!(
        shares,
        vec![
            ("Pump", 2, 25.0),
            ("Valve", 2, 25.0),
            ("Compressor", 1, 12.5),
            ("HeatExchanger", 1, 12.5),
            ("Reactor", 1, 12.5),
            ("Condenser", 1, 12.5),
        ]
    );
}

#[test]
fn summary_json_uses_renderer_keys() {
    let (_blobs, _store, pipeline) = memory_pipeline(5);
    let ds = pipeline
        .upload(&Identity::from(alice()), &fixture_upload())
        .unwrap()
        .dataset;

    let json = serde_json::to_value(pipeline.summary(&alice(), ds.id).unwrap()).unwrap();
    let obj = json.as_object().unwrap();
    for key in [
        "dataset_id",
        "dataset_name",
        "uploaded_at",
        "total_count",
        "statistics",
        "type_distribution",
    ] {
        assert!(obj.contains_key(key), "missing key {key}");
    }
    assert_eq!(json["dataset_id"], serde_json::json!(ds.id.as_uuid().to_string()));
    assert_eq!(json["statistics"]["flowrate"]["max"], serde_json::json!(170.0));
    assert_eq!(json["type_distribution"][0]["type"], serde_json::json!("Pump"));
}

#[test]
fn report_for_small_dataset_is_not_truncated() {
    let (_blobs, _store, pipeline) = memory_pipeline(5);
    let ds = pipeline
        .upload(&Identity::from(alice()), &fixture_upload())
        .unwrap()
        .dataset;

    let report = pipeline.report(&alice(), ds.id).unwrap();
    assert_eq!(report.uploaded_by, "alice");
    let names: Vec<&str> = report.sample.iter().map(|r| r.equipment_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Compressor-1",
            "Condenser-1",
            "HeatExchanger-1",
            "Pump-1",
            "Pump-2",
            "Reactor-1",
            "Valve-1",
            "Valve-2",
        ]
    );
    assert!(!report.truncated);
    assert!(report.note.is_none());
    assert!(report.generated_at >= ds.uploaded_at);
}

#[test]
fn report_for_large_dataset_samples_first_rows_by_name() {
    let (_blobs, _store, pipeline) = memory_pipeline(5);
    let ds = pipeline
        .upload(&Identity::from(alice()), &csv_upload("big.csv", 25))
        .unwrap()
        .dataset;

    let report = pipeline.report(&alice(), ds.id).unwrap();
    assert_eq!(report.sample.len(), REPORT_SAMPLE_ROWS);
    // Names sort as text: E-0, E-1, E-10..E-19, E-2, E-20..E-24, E-3, E-4.
    assert_eq!(report.sample[0].equipment_name, "E-0");
    assert_eq!(report.sample[2].equipment_name, "E-10");
    assert_eq!(report.sample[12].equipment_name, "E-2");
    assert_eq!(report.sample[19].equipment_name, "E-4");
    assert!(report.sample.iter().all(|r| r.equipment_name != "E-5"));
    assert!(report.truncated);
    assert_eq!(
        report.note.as_deref(),
        Some("Showing 20 of 25 total equipment items")
    );

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["total_count"], serde_json::json!(25));
    assert_eq!(json["sample"].as_array().unwrap().len(), 20);
}
