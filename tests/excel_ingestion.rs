#![cfg(feature = "excel_test_writer")]

mod common;

use common::{alice, memory_pipeline};
use equipment_ingest::ingestion::excel::parse_workbook_bytes;
use equipment_ingest::ingestion::validate::validate_table;
use equipment_ingest::ingestion::UploadFile;
use equipment_ingest::types::Identity;
use equipment_ingest::ErrorKind;

fn write_equipment_xlsx(include_temperature: bool) -> Vec<u8> {
    use rust_xlsxwriter::Workbook;

    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("Equipment").unwrap();

    // header on row 1, row 0 left blank
    ws.write_string(1, 0, "Equipment Name").unwrap();
    ws.write_string(1, 1, "Type").unwrap();
    ws.write_string(1, 2, "Flowrate").unwrap();
    ws.write_string(1, 3, "Pressure").unwrap();
    if include_temperature {
        ws.write_string(1, 4, "Temperature").unwrap();
    }

    ws.write_string(2, 0, "P-101").unwrap();
    ws.write_string(2, 1, "Pump").unwrap();
    ws.write_number(2, 2, 120.5).unwrap();
    ws.write_number(2, 3, 5).unwrap();
    if include_temperature {
        ws.write_number(2, 4, 80.25).unwrap();
    }

    // row 3 left empty
    ws.write_string(4, 0, "V-201").unwrap();
    ws.write_string(4, 1, "Valve").unwrap();
    ws.write_string(4, 2, "60").unwrap();
    ws.write_number(4, 3, 4.1).unwrap();
    if include_temperature {
        ws.write_number(4, 4, 75).unwrap();
    }

    wb.save_to_buffer().unwrap()
}

#[test]
fn workbook_parses_with_header_detection_and_blank_rows_dropped() {
    let table = parse_workbook_bytes(&write_equipment_xlsx(true)).unwrap();
    let rows = validate_table(&table).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(table.lines, vec![3, 5]);
    assert_eq!(rows[0].name, "P-101");
    assert_eq!(rows[0].flowrate, 120.5);
    assert_eq!(rows[0].pressure, 5.0);
    assert_eq!(rows[0].temperature, 80.25);
    assert_eq!(rows[1].equipment_type, "Valve");
    assert_eq!(rows[1].flowrate, 60.0);
}

#[test]
fn workbook_upload_goes_through_the_pipeline() {
    let (_blobs, _store, pipeline) = memory_pipeline(5);
    let upload = UploadFile::new("plant.xlsx", write_equipment_xlsx(true));
    let outcome = pipeline.upload(&Identity::from(alice()), &upload).unwrap();

    assert_eq!(outcome.dataset.aggregates.total_count, 2);
    assert_eq!(outcome.dataset.aggregates.avg_flowrate, 90.25);
}

#[test]
fn workbook_missing_column_is_a_schema_error() {
    let (_blobs, _store, pipeline) = memory_pipeline(5);
    let upload = UploadFile::new("plant.xlsx", write_equipment_xlsx(false));
    let err = pipeline.upload(&Identity::from(alice()), &upload).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(err.to_string().contains("Temperature"));
}

#[test]
fn garbage_bytes_with_workbook_extension_fail_to_parse() {
    let (_blobs, _store, pipeline) = memory_pipeline(5);
    let upload = UploadFile::new("plant.xlsx", b"not a workbook".to_vec());
    let err = pipeline.upload(&Identity::from(alice()), &upload).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}
