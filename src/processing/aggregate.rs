//! Aggregate statistics over a validated record batch.

use crate::processing::reduce::mean;
use crate::types::{Aggregates, EquipmentRow, TypeHistogram};

/// Compute count, per-metric means and the type histogram in one pass.
///
/// An empty batch yields `total_count == 0` and averages of exactly `0.0`.
/// Type labels are counted as given (no trimming or case folding). Means of finite values
/// are finite even when their sum overflows.
pub fn aggregate(rows: &[EquipmentRow]) -> Aggregates {
    let mut equipment_types = TypeHistogram::new();
    let (mut flow, mut pressure, mut temp) = (0.0_f64, 0.0_f64, 0.0_f64);

    for row in rows {
        flow += row.flowrate;
        pressure += row.pressure;
        temp += row.temperature;
        equipment_types.increment(&row.equipment_type);
    }

    let total_count = rows.len();

    Aggregates {
        total_count,
        avg_flowrate: mean(flow, rows.iter().map(|r| r.flowrate), total_count),
        avg_pressure: mean(pressure, rows.iter().map(|r| r.pressure), total_count),
        avg_temperature: mean(temp, rows.iter().map(|r| r.temperature), total_count),
        equipment_types,
    }
}
