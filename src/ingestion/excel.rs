#![cfg(feature = "excel")]

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::{PipelineError, PipelineResult};
use crate::types::RawTable;

/// Parse an uploaded workbook (`.xlsx`, `.xls`, `.ods`, etc.) into a [`RawTable`].
///
/// Behavior:
/// - Reads the first sheet in the workbook
/// - Detects the first non-empty row as the header row
/// - Converts every remaining cell into its text form; typing happens in validation
/// - Rows that are entirely empty after the header are dropped
/// - Each row keeps its 1-based sheet row number
pub fn parse_workbook_bytes(bytes: &[u8]) -> PipelineResult<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| PipelineError::Parse {
            message: "workbook has no sheets".to_string(),
        })?;
    let range = workbook.worksheet_range(&first)?;

    // Sheet row of the first row in the used range (0-based).
    let first_row = range.start().map(|(r, _)| u64::from(r)).unwrap_or(0);

    let mut rows_iter = range
        .rows()
        .enumerate()
        .skip_while(|(_, row)| row.iter().all(|c| matches!(c, Data::Empty)));

    let headers: Vec<String> = rows_iter
        .next()
        .map(|(_, row)| row.iter().map(cell_to_string).collect())
        .ok_or_else(|| PipelineError::Parse {
            message: format!("sheet '{first}' has no non-empty rows (no header row found)"),
        })?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut lines: Vec<u64> = Vec::new();
    for (idx, row) in rows_iter.filter(|(_, row)| row.iter().any(|c| !matches!(c, Data::Empty))) {
        lines.push(first_row + idx as u64 + 1);
        rows.push(row.iter().map(cell_to_string).collect());
    }

    Ok(RawTable::new(headers, rows).with_lines(lines))
}

fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(f) => f.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}
