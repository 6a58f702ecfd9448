use equipment_ingest::ingestion::csv::{parse_csv_bytes, parse_csv_from_reader};
use equipment_ingest::ingestion::validate::validate_table;
use equipment_ingest::PipelineError;

fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(format!("tests/fixtures/{name}")).unwrap()
}

#[test]
fn parse_and_validate_fixture_happy_path() {
    let table = parse_csv_bytes(&fixture("equipment.csv")).unwrap();
    let rows = validate_table(&table).unwrap();

    assert_eq!(rows.len(), 8);
    assert_eq!(rows[0].name, "Pump-1");
    assert_eq!(rows[0].equipment_type, "Pump");
    assert_eq!(rows[0].flowrate, 120.5);
    assert_eq!(rows[0].pressure, 5.2);
    assert_eq!(rows[0].temperature, 110.0);
}

#[test]
fn validate_allows_reordered_columns() {
    let input = "Temperature,Pressure,Flowrate,Type,Equipment Name\n80,2.5,100,Pump,P-1\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let rows = validate_table(&parse_csv_from_reader(&mut rdr).unwrap()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "P-1");
    assert_eq!(rows[0].flowrate, 100.0);
}

#[test]
fn validate_names_every_missing_column() {
    let table = parse_csv_bytes(&fixture("missing_columns.csv")).unwrap();
    let err = validate_table(&table).unwrap_err();

    match &err {
        PipelineError::Schema { missing } => {
            assert_eq!(missing, &vec!["Pressure".to_string(), "Temperature".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("Pressure"));
    assert!(msg.contains("Temperature"));
}

#[test]
fn validate_errors_on_non_numeric_metric() {
    let input = b"Equipment Name,Type,Flowrate,Pressure,Temperature\nP-1,Pump,fast,2,3\n";
    let err = validate_table(&parse_csv_bytes(input).unwrap()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("failed to parse value"));
    assert!(msg.contains("row 2"));
    assert!(msg.contains("column 'Flowrate'"));
}

#[test]
fn row_error_reports_the_file_line_past_blank_lines_and_multiline_fields() {
    let input = b"Equipment Name,Type,Flowrate,Pressure,Temperature\n\
P-1,Pump,10,2,3\n\
\n\
\"P-2\nspare\",Pump,10,2,3\n\
P-3,Pump,10,2,oops\n";
    let err = validate_table(&parse_csv_bytes(input).unwrap()).unwrap_err();

    match err {
        PipelineError::RowType { row, column, raw, .. } => {
            assert_eq!(row, 6);
            assert_eq!(column, "Temperature");
            assert_eq!(raw, "oops");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn header_only_table_validates_to_zero_rows() {
    let input = b"Equipment Name,Type,Flowrate,Pressure,Temperature\n";
    let rows = validate_table(&parse_csv_bytes(input).unwrap()).unwrap();
    assert!(rows.is_empty());
}
