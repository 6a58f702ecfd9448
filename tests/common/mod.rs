#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use equipment_ingest::config::PipelineConfig;
use equipment_ingest::error::{PipelineError, PipelineResult};
use equipment_ingest::ingestion::UploadFile;
use equipment_ingest::pipeline::IngestionPipeline;
use equipment_ingest::store::{
    BlobStore, DatasetStore, MemoryBlobStore, MemoryDatasetStore, NewDataset,
};
use equipment_ingest::types::{Dataset, DatasetId, EquipmentRecord, Principal};

pub const HEADER: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n";

/// A CSV upload with `n` rows.
pub fn csv_upload(file_name: &str, n: usize) -> UploadFile {
    let mut body = HEADER.to_string();
    for i in 0..n {
        let ty = ["Pump", "Valve", "Reactor"][i % 3];
        body.push_str(&format!("E-{i},{ty},{},{},{}\n", 10.0 + i as f64, 1.5 * i as f64, 100.0 - i as f64));
    }
    UploadFile::new(file_name, body)
}

pub fn memory_pipeline(cap: i64) -> (Arc<MemoryBlobStore>, Arc<MemoryDatasetStore>, IngestionPipeline) {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = Arc::new(MemoryDatasetStore::new(blobs.clone()));
    let pipeline = IngestionPipeline::new(
        store.clone(),
        PipelineConfig {
            max_datasets_per_owner: cap,
            ..Default::default()
        },
    )
    .unwrap();
    (blobs, store, pipeline)
}

pub fn alice() -> Principal {
    Principal::new("alice")
}

pub fn bob() -> Principal {
    Principal::new("bob")
}

/// Wraps a real store; `create` writes everything and then reports failure, like a
/// non-transactional backend that died after the rows landed.
pub struct HalfWritingStore {
    pub inner: Arc<MemoryDatasetStore>,
    pub fail_create: AtomicBool,
}

impl HalfWritingStore {
    pub fn new(inner: Arc<MemoryDatasetStore>) -> Self {
        Self {
            inner,
            fail_create: AtomicBool::new(true),
        }
    }
}

impl DatasetStore for HalfWritingStore {
    fn create(&self, new: NewDataset) -> PipelineResult<Dataset> {
        let ds = self.inner.create(new)?;
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PipelineError::Persistence {
                message: format!("connection lost after writing {}", ds.id),
            });
        }
        Ok(ds)
    }

    fn delete(&self, id: DatasetId) -> PipelineResult<bool> {
        self.inner.delete(id)
    }

    fn get(&self, id: DatasetId) -> PipelineResult<Option<Dataset>> {
        self.inner.get(id)
    }

    fn records(&self, id: DatasetId) -> PipelineResult<Vec<EquipmentRecord>> {
        self.inner.records(id)
    }

    fn list_by_owner(&self, owner: &Principal) -> PipelineResult<Vec<Dataset>> {
        self.inner.list_by_owner(owner)
    }
}

/// Blob store whose deletes fail while `fail_deletes` is set.
#[derive(Default)]
pub struct StickyBlobStore {
    pub inner: MemoryBlobStore,
    pub fail_deletes: AtomicBool,
    pub delete_calls: AtomicUsize,
}

impl BlobStore for StickyBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> PipelineResult<()> {
        self.inner.put(key, bytes)
    }

    fn delete(&self, key: &str) -> PipelineResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PipelineError::Persistence {
                message: format!("blob {key} is locked"),
            });
        }
        self.inner.delete(key)
    }

    fn exists(&self, key: &str) -> PipelineResult<bool> {
        self.inner.exists(key)
    }
}
