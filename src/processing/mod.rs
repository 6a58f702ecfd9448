//! In-memory computations over equipment record batches.
//!
//! - [`aggregate()`]: the commit-time [`crate::types::Aggregates`] (count, means, type histogram)
//! - [`reduce()`]: single-metric reductions (sum/min/max/mean) used by summaries
//!
//! ## Example
//!
//! ```rust
//! use equipment_ingest::processing::{aggregate, reduce, Metric, ReduceOp};
//! use equipment_ingest::types::EquipmentRow;
//!
//! let rows = vec![
//!     EquipmentRow {
//!         name: "P-101".to_string(),
//!         equipment_type: "Pump".to_string(),
//!         flowrate: 120.0,
//!         pressure: 5.5,
//!         temperature: 80.0,
//!     },
//!     EquipmentRow {
//!         name: "V-201".to_string(),
//!         equipment_type: "Valve".to_string(),
//!         flowrate: 60.0,
//!         pressure: 4.5,
//!         temperature: 70.0,
//!     },
//! ];
//!
//! let agg = aggregate(&rows);
//! assert_eq!(agg.total_count, 2);
//! assert_eq!(agg.avg_flowrate, 90.0);
//! assert_eq!(reduce(&rows, Metric::Pressure, ReduceOp::Max), Some(5.5));
//! ```

pub mod aggregate;
pub mod reduce;

pub use aggregate::aggregate;
pub use reduce::{reduce, Measured, Metric, ReduceOp};
