//! `equipment-ingest` turns uploaded tables of chemical-process equipment into stored,
//! summarized datasets.
//!
//! The primary entrypoint is [`pipeline::IngestionPipeline::upload`], which validates and parses
//! an uploaded file, computes aggregate statistics, commits the dataset and its records as one
//! unit, and then trims the owner's datasets down to the configured retention cap.
//!
//! ## Upload contract
//!
//! **File formats (detected by extension):**
//!
//! - **CSV**: `.csv`
//! - **Workbooks** (requires the Cargo feature `excel`): `.xlsx`, `.xls`, `.xlsm`, `.ods`
//!
//! Files over the size ceiling (default 5 MiB) or with any other extension are rejected before
//! parsing.
//!
//! **Required columns** (exact, case-sensitive labels; order does not matter, extra columns are
//! ignored): `Equipment Name`, `Type`, `Flowrate`, `Pressure`, `Temperature`. The three metric
//! columns must hold finite numbers in every row.
//!
//! ## Quick example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use equipment_ingest::config::PipelineConfig;
//! use equipment_ingest::ingestion::UploadFile;
//! use equipment_ingest::pipeline::IngestionPipeline;
//! use equipment_ingest::store::{MemoryBlobStore, MemoryDatasetStore};
//! use equipment_ingest::types::{Identity, Principal};
//!
//! # fn main() -> Result<(), equipment_ingest::PipelineError> {
//! let store = Arc::new(MemoryDatasetStore::new(Arc::new(MemoryBlobStore::new())));
//! let pipeline = IngestionPipeline::new(store, PipelineConfig::default())?;
//!
//! let csv = "\
//! Equipment Name,Type,Flowrate,Pressure,Temperature
//! P-101,Pump,120.5,5.2,80
//! V-201,Valve,60,4.1,75.5
//! ";
//! let alice = Identity::from(Principal::new("alice"));
//! let outcome = pipeline.upload(&alice, &UploadFile::new("plant.csv", csv))?;
//!
//! assert_eq!(outcome.dataset.aggregates.total_count, 2);
//! assert_eq!(outcome.dataset.aggregates.equipment_types.get("Pump"), Some(1));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`pipeline`]: upload orchestration, owner-scoped reads and deletion
//! - [`ingestion`]: upload pre-checks, parsing, validation, observer hooks
//! - [`processing`]: aggregates and metric reductions
//! - [`store`]: dataset/record/blob persistence
//! - [`retention`]: per-owner retention cap
//! - [`report`]: summary and report models for external renderers
//! - [`execution`]: running many uploads on a bounded worker pool
//! - [`config`]: pipeline configuration
//! - [`types`]: data model
//! - [`error`]: the shared error type

pub mod config;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod pipeline;
pub mod processing;
pub mod report;
pub mod retention;
pub mod store;
pub mod types;

pub use error::{ErrorKind, PipelineError, PipelineResult};
