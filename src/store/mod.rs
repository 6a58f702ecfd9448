//! Persistence boundary for datasets, their equipment records, and their file blobs.
//!
//! [`DatasetStore::create`] persists a dataset and every one of its records as one
//! all-or-nothing unit; [`DatasetStore::delete`] removes the file blob, then the records,
//! then the dataset, and is a no-op for ids that are already gone.

mod blob;
mod memory;

use std::path::Path;

use crate::error::PipelineResult;
use crate::types::{Aggregates, Dataset, DatasetId, EquipmentRecord, Principal};

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use memory::MemoryDatasetStore;

/// The uploaded file content to keep alongside a dataset.
#[derive(Clone)]
pub struct FileBlob {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for FileBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBlob")
            .field("file_name", &self.file_name)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

/// Everything needed to commit a dataset.
///
/// The id is allocated by the caller before `create` so that a failed, non-atomic create
/// can still be cleaned up with `delete(id)`.
#[derive(Debug, Clone)]
pub struct NewDataset {
    pub id: DatasetId,
    pub owner: Principal,
    pub name: String,
    pub file: FileBlob,
    pub records: Vec<EquipmentRecord>,
    pub aggregates: Aggregates,
}

impl NewDataset {
    /// Key under which the file blob is stored: `datasets/<id>/<file name>`.
    pub fn blob_key(&self) -> String {
        blob_key(self.id, &self.file.file_name)
    }
}

/// Build a blob key. Only the final path component of `file_name` is kept.
pub fn blob_key(id: DatasetId, file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("upload");
    format!("datasets/{id}/{base}")
}

/// Storage for committed datasets.
pub trait DatasetStore: Send + Sync {
    /// Persist the dataset row and every record in a single all-or-nothing unit.
    ///
    /// The commit timestamp is assigned here and is non-decreasing in insertion order.
    fn create(&self, new: NewDataset) -> PipelineResult<Dataset>;

    /// Remove the file blob, then all records, then the dataset row.
    ///
    /// Returns `Ok(false)` when the id does not exist (already deleted).
    fn delete(&self, id: DatasetId) -> PipelineResult<bool>;

    /// Fetch one dataset.
    fn get(&self, id: DatasetId) -> PipelineResult<Option<Dataset>>;

    /// The dataset's records, ordered by equipment name. Equal names keep upload order.
    fn records(&self, id: DatasetId) -> PipelineResult<Vec<EquipmentRecord>>;

    /// Number of records currently stored for the dataset.
    fn record_count(&self, id: DatasetId) -> PipelineResult<usize> {
        Ok(self.records(id)?.len())
    }

    /// The owner's datasets, newest first.
    fn list_by_owner(&self, owner: &Principal) -> PipelineResult<Vec<Dataset>>;
}
