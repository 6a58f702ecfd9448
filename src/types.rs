//! Core data model types.
//!
//! A [`Dataset`] is an immutable, named batch of [`EquipmentRecord`]s owned by one
//! [`Principal`], carrying [`Aggregates`] computed once at commit time. Uploaded files are
//! first parsed into a [`RawTable`] of untyped cells, which the validator turns into typed
//! [`EquipmentRow`]s.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Column label for the equipment name.
pub const COL_NAME: &str = "Equipment Name";
/// Column label for the equipment type.
pub const COL_TYPE: &str = "Type";
/// Column label for the flowrate metric.
pub const COL_FLOWRATE: &str = "Flowrate";
/// Column label for the pressure metric.
pub const COL_PRESSURE: &str = "Pressure";
/// Column label for the temperature metric.
pub const COL_TEMPERATURE: &str = "Temperature";

/// Required columns, in the order they are reported when missing.
pub const REQUIRED_COLUMNS: [&str; 5] = [COL_NAME, COL_TYPE, COL_FLOWRATE, COL_PRESSURE, COL_TEMPERATURE];

/// Opaque identity of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is making a request, as resolved by the external authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Authenticated(Principal),
}

impl Identity {
    /// Returns the principal, if the caller is authenticated.
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(p) => Some(p),
        }
    }
}

impl From<Principal> for Identity {
    fn from(p: Principal) -> Self {
        Self::Authenticated(p)
    }
}

/// Opaque dataset identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(Uuid);

impl DatasetId {
    /// Allocate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DatasetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// A parsed but untyped table: header labels plus row-major raw cell text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 1-based source line of each row, parallel to `rows`. Empty when unknown.
    pub lines: Vec<u64>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers,
            rows,
            lines: Vec::new(),
        }
    }

    /// Attach the source line of each row.
    pub fn with_lines(mut self, lines: Vec<u64>) -> Self {
        self.lines = lines;
        self
    }

    /// Source line of row `idx`; without recorded lines, assumes one line per row after a
    /// single header line.
    pub fn line_of(&self, idx: usize) -> u64 {
        self.lines.get(idx).copied().unwrap_or(idx as u64 + 2)
    }

    /// Returns the index of the first header equal to `label` (case-sensitive).
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == label)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// One validated, typed row, not yet bound to a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentRow {
    pub name: String,
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

/// One row of equipment measurements belonging to exactly one [`Dataset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub dataset_id: DatasetId,
    pub equipment_name: String,
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

impl EquipmentRecord {
    /// Bind a validated row to its owning dataset.
    pub fn from_row(dataset_id: DatasetId, row: EquipmentRow) -> Self {
        Self {
            dataset_id,
            equipment_name: row.name,
            equipment_type: row.equipment_type,
            flowrate: row.flowrate,
            pressure: row.pressure,
            temperature: row.temperature,
        }
    }
}

/// Type label -> count, iterated in order of first occurrence.
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeHistogram {
    entries: Vec<(String, usize)>,
}

impl TypeHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `label`.
    pub fn increment(&mut self, label: &str) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, n)) => *n += 1,
            None => self.entries.push((label.to_owned(), 1)),
        }
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.entries.iter().find(|(l, _)| l == label).map(|(_, n)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(l, n)| (l.as_str(), *n))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    /// Sorted map view, for callers that want keyed lookups.
    pub fn to_map(&self) -> BTreeMap<String, usize> {
        self.entries.iter().cloned().collect()
    }
}

impl Serialize for TypeHistogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, count) in &self.entries {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Aggregate statistics derived once from a dataset's records at commit time.
///
/// Never patched in place; a recompute replaces the whole value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Aggregates {
    pub total_count: usize,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub equipment_types: TypeHistogram,
}

/// A committed dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub id: DatasetId,
    pub owner: Principal,
    pub name: String,
    /// Key of the stored file blob.
    pub file: String,
    pub uploaded_at: DateTime<Utc>,
    /// Commit sequence number; breaks ties between equal timestamps.
    pub seq: u64,
    pub aggregates: Aggregates,
}

impl Dataset {
    pub fn total_count(&self) -> usize {
        self.aggregates.total_count
    }
}

/// Lightweight listing entry for an owner's datasets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetListing {
    pub id: DatasetId,
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
    pub total_count: usize,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub equipment_types: BTreeMap<String, usize>,
    pub equipment_count: usize,
}

impl DatasetListing {
    pub fn new(dataset: &Dataset, equipment_count: usize) -> Self {
        let agg = &dataset.aggregates;
        Self {
            id: dataset.id,
            name: dataset.name.clone(),
            uploaded_at: dataset.uploaded_at,
            total_count: agg.total_count,
            avg_flowrate: agg.avg_flowrate,
            avg_pressure: agg.avg_pressure,
            avg_temperature: agg.avg_temperature,
            equipment_types: agg.equipment_types.to_map(),
            equipment_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RawTable, TypeHistogram};

    #[test]
    fn histogram_keeps_first_occurrence_order_and_raw_labels() {
        let mut h = TypeHistogram::new();
        for label in ["Pump", "Valve", "pump", "Pump", " Valve"] {
            h.increment(label);
        }
        let got: Vec<(&str, usize)> = h.iter().collect();
        assert_eq!(got, vec![("Pump", 2), ("Valve", 1), ("pump", 1), (" Valve", 1)]);
        assert_eq!(h.total(), 5);
        assert_eq!(h.get("Reactor"), None);
    }

    #[test]
    fn histogram_serializes_as_ordered_object() {
        let mut h = TypeHistogram::new();
        h.increment("Valve");
        h.increment("Pump");
        h.increment("Valve");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"{"Valve":2,"Pump":1}"#);
    }

    #[test]
    fn raw_table_index_of_is_case_sensitive() {
        let t = RawTable::new(vec!["Type".to_string(), "flowrate".to_string()], vec![]);
        assert_eq!(t.index_of("Type"), Some(0));
        assert_eq!(t.index_of("Flowrate"), None);
    }
}
