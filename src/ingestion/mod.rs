//! Upload parsing and validation.
//!
//! Most callers go through [`crate::pipeline::IngestionPipeline`], which uses:
//!
//! - [`upload`]: pre-parse checks (size ceiling, extension) and format dispatch
//! - [`csv`] (and [`excel`] with the `excel` feature): bytes -> [`crate::types::RawTable`]
//! - [`validate`]: required columns and numeric coercion -> typed rows
//! - [`observability`]: observer hooks for success/failure/alerts

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod observability;
pub mod upload;
pub mod validate;

pub use observability::{
    CommitStats, CompositeObserver, FileObserver, LogObserver, PipelineObserver, PipelineSeverity,
    UploadContext,
};
pub use upload::{parse_upload, UploadFile, UploadFormat};
pub use validate::{check_columns, validate_table, ColumnProjection};
