//! Record validation: required-column contract and per-cell numeric coercion.

use crate::error::{PipelineError, PipelineResult};
use crate::types::{
    EquipmentRow, RawTable, COL_FLOWRATE, COL_NAME, COL_PRESSURE, COL_TEMPERATURE, COL_TYPE,
    REQUIRED_COLUMNS,
};

/// Column positions of the required fields within a [`RawTable`].
///
/// Columns may appear in any order; extra columns are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnProjection {
    pub name: usize,
    pub equipment_type: usize,
    pub flowrate: usize,
    pub pressure: usize,
    pub temperature: usize,
}

/// Verify every required column is present.
///
/// Fails with [`PipelineError::Schema`] naming *every* missing column, in
/// [`REQUIRED_COLUMNS`] order. Labels are matched exactly (case-sensitive).
pub fn check_columns(table: &RawTable) -> PipelineResult<ColumnProjection> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| table.index_of(c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Schema { missing });
    }

    let idx = |label: &str| table.index_of(label).unwrap_or_default();
    Ok(ColumnProjection {
        name: idx(COL_NAME),
        equipment_type: idx(COL_TYPE),
        flowrate: idx(COL_FLOWRATE),
        pressure: idx(COL_PRESSURE),
        temperature: idx(COL_TEMPERATURE),
    })
}

/// Validate a parsed table into typed rows.
///
/// Zero data rows is valid. The first row whose numeric cell cannot be coerced fails the
/// whole table with [`PipelineError::RowType`]; rows are never skipped.
pub fn validate_table(table: &RawTable) -> PipelineResult<Vec<EquipmentRow>> {
    let cols = check_columns(table)?;

    let mut out = Vec::with_capacity(table.row_count());
    for (row_idx0, row) in table.rows.iter().enumerate() {
        let user_row = table.line_of(row_idx0);
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");

        out.push(EquipmentRow {
            name: cell(cols.name).to_owned(),
            equipment_type: cell(cols.equipment_type).to_owned(),
            flowrate: parse_metric(user_row, COL_FLOWRATE, cell(cols.flowrate))?,
            pressure: parse_metric(user_row, COL_PRESSURE, cell(cols.pressure))?,
            temperature: parse_metric(user_row, COL_TEMPERATURE, cell(cols.temperature))?,
        });
    }
    Ok(out)
}

/// Coerce one cell to a finite float. Surrounding whitespace is ignored.
pub(crate) fn parse_metric(row: u64, column: &str, raw: &str) -> PipelineResult<f64> {
    let err = |message: String| PipelineError::RowType {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(err("expected a number, found an empty cell".to_string()));
    }
    let v = trimmed.parse::<f64>().map_err(|e| err(e.to_string()))?;
    if !v.is_finite() {
        return Err(err("expected a finite number".to_string()));
    }
    Ok(v)
}
