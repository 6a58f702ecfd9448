//! Presentation-ready summary and report models.
//!
//! These structures are the only interface to external renderers (charts, documents).
//! [`DatasetSummary`] serializes with the keys
//! `dataset_id, dataset_name, uploaded_at, total_count, statistics, type_distribution`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::processing::{reduce, Metric, ReduceOp};
use crate::types::{Dataset, DatasetId, EquipmentRecord};

/// Number of records included in a report sample.
pub const REPORT_SAMPLE_ROWS: usize = 20;

/// `{average, min, max}` for one metric, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub flowrate: MetricStats,
    pub pressure: MetricStats,
    pub temperature: MetricStats,
}

impl Statistics {
    pub fn get(&self, metric: Metric) -> &MetricStats {
        match metric {
            Metric::Flowrate => &self.flowrate,
            Metric::Pressure => &self.pressure,
            Metric::Temperature => &self.temperature,
        }
    }
}

/// One histogram bucket with its share of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeShare {
    #[serde(rename = "type")]
    pub equipment_type: String,
    pub count: usize,
    /// `100 * count / total_count`, rounded to two decimals.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub dataset_id: DatasetId,
    pub dataset_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub total_count: usize,
    pub statistics: Statistics,
    pub type_distribution: Vec<TypeShare>,
}

/// One record as shown in a report sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRow {
    pub equipment_name: String,
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

impl From<&EquipmentRecord> for SampleRow {
    fn from(r: &EquipmentRecord) -> Self {
        Self {
            equipment_name: r.equipment_name.clone(),
            equipment_type: r.equipment_type.clone(),
            flowrate: r.flowrate,
            pressure: r.pressure,
            temperature: r.temperature,
        }
    }
}

/// Full report model: dataset info, summary, and a bounded sample of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetReport {
    #[serde(flatten)]
    pub summary: DatasetSummary,
    pub uploaded_by: String,
    pub sample: Vec<SampleRow>,
    /// Set when `total_count` exceeds the sample size.
    pub truncated: bool,
    pub note: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Round to two decimals. Values too large to scale by 100 have no fractional part and are
/// returned unchanged.
pub(crate) fn round2(v: f64) -> f64 {
    let scaled = v * 100.0;
    if !scaled.is_finite() {
        return v;
    }
    scaled.round() / 100.0
}

fn metric_stats(average: f64, records: &[EquipmentRecord], metric: Metric) -> MetricStats {
    // min/max come from the current rows, 0 when there are none.
    MetricStats {
        average: round2(average),
        min: reduce(records, metric, ReduceOp::Min).map(round2).unwrap_or(0.0),
        max: reduce(records, metric, ReduceOp::Max).map(round2).unwrap_or(0.0),
    }
}

/// Build the summary of a committed dataset from its stored aggregates and current records.
pub fn build_summary(dataset: &Dataset, records: &[EquipmentRecord]) -> DatasetSummary {
    let agg = &dataset.aggregates;
    let total = agg.total_count;

    let type_distribution = if total == 0 {
        Vec::new()
    } else {
        agg.equipment_types
            .iter()
            .map(|(label, count)| TypeShare {
                equipment_type: label.to_owned(),
                count,
                percentage: round2(100.0 * count as f64 / total as f64),
            })
            .collect()
    };

    DatasetSummary {
        dataset_id: dataset.id,
        dataset_name: dataset.name.clone(),
        uploaded_at: dataset.uploaded_at,
        total_count: total,
        statistics: Statistics {
            flowrate: metric_stats(agg.avg_flowrate, records, Metric::Flowrate),
            pressure: metric_stats(agg.avg_pressure, records, Metric::Pressure),
            temperature: metric_stats(agg.avg_temperature, records, Metric::Temperature),
        },
        type_distribution,
    }
}

/// Build the report model. The sample is the first rows of `records` as given; stores
/// return them ordered by equipment name.
pub fn build_report(
    dataset: &Dataset,
    records: &[EquipmentRecord],
    generated_at: DateTime<Utc>,
) -> DatasetReport {
    let summary = build_summary(dataset, records);
    let total = summary.total_count;
    let truncated = total > REPORT_SAMPLE_ROWS;

    DatasetReport {
        uploaded_by: dataset.owner.to_string(),
        sample: records.iter().take(REPORT_SAMPLE_ROWS).map(SampleRow::from).collect(),
        truncated,
        note: truncated.then(|| {
            format!("Showing {REPORT_SAMPLE_ROWS} of {total} total equipment items")
        }),
        generated_at,
        summary,
    }
}
