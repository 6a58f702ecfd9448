use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{Dataset, DatasetId, EquipmentRecord, Principal};

use super::{BlobStore, DatasetStore, NewDataset};

#[derive(Default)]
struct Inner {
    datasets: HashMap<DatasetId, Dataset>,
    /// Record arena keyed by owning dataset, each batch sorted by equipment name.
    records: HashMap<DatasetId, Vec<EquipmentRecord>>,
    next_seq: u64,
    last_commit: Option<DateTime<Utc>>,
}

/// In-memory [`DatasetStore`].
///
/// Dataset rows and their records are inserted and removed under one write lock, so a
/// reader never observes a dataset without its full record set.
pub struct MemoryDatasetStore {
    blobs: Arc<dyn BlobStore>,
    inner: RwLock<Inner>,
}

impl fmt::Debug for MemoryDatasetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (datasets, records) = self
            .inner
            .read()
            .map(|g| (g.datasets.len(), g.records.values().map(Vec::len).sum::<usize>()))
            .unwrap_or_default();
        f.debug_struct("MemoryDatasetStore")
            .field("datasets", &datasets)
            .field("records", &records)
            .finish()
    }
}

impl MemoryDatasetStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// The blob store backing this dataset store.
    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Total number of records across all datasets.
    pub fn total_records(&self) -> PipelineResult<usize> {
        Ok(self.read()?.records.values().map(Vec::len).sum())
    }

    fn read(&self) -> PipelineResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| PipelineError::persistence("dataset store lock poisoned"))
    }

    fn write(&self) -> PipelineResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| PipelineError::persistence("dataset store lock poisoned"))
    }
}

fn check_consistent(new: &NewDataset) -> PipelineResult<()> {
    let agg = &new.aggregates;
    if agg.total_count != new.records.len() || agg.equipment_types.total() != new.records.len() {
        return Err(PipelineError::persistence(format!(
            "aggregates do not match record batch for dataset {} (total_count={}, histogram={}, records={})",
            new.id,
            agg.total_count,
            agg.equipment_types.total(),
            new.records.len()
        )));
    }
    if let Some(stray) = new.records.iter().find(|r| r.dataset_id != new.id) {
        return Err(PipelineError::persistence(format!(
            "record bound to dataset {} in batch for {}",
            stray.dataset_id, new.id
        )));
    }
    Ok(())
}

impl DatasetStore for MemoryDatasetStore {
    fn create(&self, new: NewDataset) -> PipelineResult<Dataset> {
        check_consistent(&new)?;
        let key = new.blob_key();

        if self.read()?.datasets.contains_key(&new.id) {
            return Err(PipelineError::persistence(format!("dataset {} already exists", new.id)));
        }

        self.blobs.put(&key, &new.file.bytes)?;

        let mut inner = match self.write() {
            Ok(g) => g,
            Err(e) => {
                let _ = self.blobs.delete(&key);
                return Err(e);
            }
        };

        let now = Utc::now();
        let uploaded_at = match inner.last_commit {
            Some(last) if last > now => last,
            _ => now,
        };
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.last_commit = Some(uploaded_at);

        let mut records = new.records;
        records.sort_by(|a, b| a.equipment_name.cmp(&b.equipment_name));

        let dataset = Dataset {
            id: new.id,
            owner: new.owner,
            name: new.name,
            file: key,
            uploaded_at,
            seq,
            aggregates: new.aggregates,
        };
        inner.records.insert(dataset.id, records);
        inner.datasets.insert(dataset.id, dataset.clone());

        tracing::debug!(dataset_id = %dataset.id, owner = %dataset.owner, seq, "dataset committed");
        Ok(dataset)
    }

    fn delete(&self, id: DatasetId) -> PipelineResult<bool> {
        let mut inner = self.write()?;
        let Some(file) = inner.datasets.get(&id).map(|d| d.file.clone()) else {
            return Ok(false);
        };

        // Blob first: if it fails the rows stay and the delete can be retried.
        self.blobs.delete(&file)?;
        let removed = inner.records.remove(&id).map(|r| r.len()).unwrap_or(0);
        inner.datasets.remove(&id);

        tracing::debug!(dataset_id = %id, records = removed, "dataset deleted");
        Ok(true)
    }

    fn get(&self, id: DatasetId) -> PipelineResult<Option<Dataset>> {
        Ok(self.read()?.datasets.get(&id).cloned())
    }

    fn records(&self, id: DatasetId) -> PipelineResult<Vec<EquipmentRecord>> {
        Ok(self.read()?.records.get(&id).cloned().unwrap_or_default())
    }

    fn record_count(&self, id: DatasetId) -> PipelineResult<usize> {
        Ok(self.read()?.records.get(&id).map(Vec::len).unwrap_or(0))
    }

    fn list_by_owner(&self, owner: &Principal) -> PipelineResult<Vec<Dataset>> {
        let inner = self.read()?;
        let mut out: Vec<Dataset> = inner
            .datasets
            .values()
            .filter(|d| &d.owner == owner)
            .cloned()
            .collect();
        out.sort_by(|a, b| (b.uploaded_at, b.seq).cmp(&(a.uploaded_at, a.seq)));
        Ok(out)
    }
}
