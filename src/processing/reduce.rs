//! Reduction operations over one metric of a record batch.

use serde::Serialize;

use crate::types::{EquipmentRecord, EquipmentRow};

/// A numeric measurement column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Flowrate,
    Pressure,
    Temperature,
}

impl Metric {
    /// All metrics, in report order.
    pub const ALL: [Metric; 3] = [Metric::Flowrate, Metric::Pressure, Metric::Temperature];
}

/// Anything that carries the three equipment metrics.
pub trait Measured {
    fn metric(&self, metric: Metric) -> f64;
}

impl Measured for EquipmentRecord {
    fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Flowrate => self.flowrate,
            Metric::Pressure => self.pressure,
            Metric::Temperature => self.temperature,
        }
    }
}

impl Measured for EquipmentRow {
    fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Flowrate => self.flowrate,
            Metric::Pressure => self.pressure,
            Metric::Temperature => self.temperature,
        }
    }
}

/// Built-in reduction operations over a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Sum of values.
    Sum,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
    /// Unweighted arithmetic mean.
    Mean,
}

/// Reduce one metric across `items`.
///
/// Returns `None` when `items` is empty; callers decide what an empty batch reports.
pub fn reduce<T: Measured>(items: &[T], metric: Metric, op: ReduceOp) -> Option<f64> {
    let mut values = items.iter().map(|r| r.metric(metric));
    let first = values.next()?;
    let (acc, n) = values.fold((first, 1usize), |(acc, n), v| {
        let acc = match op {
            ReduceOp::Sum | ReduceOp::Mean => acc + v,
            ReduceOp::Min => acc.min(v),
            ReduceOp::Max => acc.max(v),
        };
        (acc, n + 1)
    });

    Some(match op {
        ReduceOp::Mean => mean(acc, items.iter().map(|r| r.metric(metric)), n),
        _ => acc,
    })
}

/// Mean from a precomputed `sum` of `n` values.
///
/// When the sum overflowed, the mean is recomputed as the sum of `v / n`, which stays finite
/// for finite inputs.
pub(crate) fn mean(sum: f64, values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    if sum.is_finite() {
        sum / n
    } else {
        values.map(|v| v / n).sum()
    }
}
