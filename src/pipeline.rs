//! Upload orchestration.
//!
//! [`IngestionPipeline::upload`] runs one upload through
//! `Received -> Validated -> RecordsBuilt -> Committed -> RetentionApplied`, with `Failed`
//! reachable from every non-terminal state:
//!
//! 1. the caller must be an authenticated principal (checked before touching the file)
//! 2. pre-checks + parse into a table
//! 3. validate required columns and coerce numeric cells
//! 4. bind records to a fresh dataset id and compute aggregates
//! 5. commit through [`DatasetStore::create`]; on failure, compensating `delete`
//! 6. apply retention for the owner; eviction failures do not undo the commit
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
//! let csv = "Equipment Name,Type,Flowrate,Pressure,Temperature\nP-101,Pump,120,5.5,80\n";
//! let alice = Principal::new("alice");
//! let outcome = pipeline.upload(&Identity::from(alice.clone()), &UploadFile::new("plant.csv", csv))?;
//!
//! let summary = pipeline.summary(&alice, outcome.dataset.id)?;
//! assert_eq!(summary.total_count, 1);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::ingestion::observability::{CommitStats, PipelineObserver, PipelineSeverity, UploadContext};
use crate::ingestion::upload::{parse_upload, UploadFile};
use crate::ingestion::validate::validate_table;
use crate::processing::aggregate;
use crate::report::{build_report, build_summary, DatasetReport, DatasetSummary};
use crate::retention::{RetentionPolicy, RetentionReport};
use crate::store::{DatasetStore, FileBlob, NewDataset};
use crate::types::{
    Dataset, DatasetId, DatasetListing, EquipmentRecord, Identity, Principal,
};

/// States of one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Received,
    Validated,
    RecordsBuilt,
    Committed,
    RetentionApplied,
    Failed,
}

impl UploadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::RetentionApplied | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: UploadState) -> bool {
        use UploadState::*;
        match (self, next) {
            (s, Failed) => !s.is_terminal(),
            (Received, Validated)
            | (Validated, RecordsBuilt)
            | (RecordsBuilt, Committed)
            | (Committed, RetentionApplied) => true,
            _ => false,
        }
    }
}

/// Records the states one upload passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTrace {
    states: Vec<UploadState>,
}

impl UploadTrace {
    pub(crate) fn new() -> Self {
        Self {
            states: vec![UploadState::Received],
        }
    }

    pub fn current(&self) -> UploadState {
        self.states.last().copied().unwrap_or(UploadState::Received)
    }

    pub fn states(&self) -> &[UploadState] {
        &self.states
    }

    fn advance(&mut self, next: UploadState) {
        debug_assert!(
            self.current().can_advance_to(next),
            "illegal upload transition {:?} -> {next:?}",
            self.current()
        );
        self.states.push(next);
    }
}

/// Result of a successful upload.
#[derive(Debug)]
pub struct UploadOutcome {
    /// The committed dataset, with its identity and aggregates.
    pub dataset: Dataset,
    /// Retention sweep result. An `Err` here means the sweep could not list the owner's
    /// datasets; the upload itself is still committed.
    pub retention: PipelineResult<RetentionReport>,
    pub trace: UploadTrace,
}

/// Coordinates validation, aggregation, storage and retention for uploads.
pub struct IngestionPipeline {
    store: Arc<dyn DatasetStore>,
    config: PipelineConfig,
    retention: RetentionPolicy,
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("config", &self.config)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

impl IngestionPipeline {
    /// Create a pipeline. Fails with [`PipelineError::Config`] on an invalid config.
    pub fn new(store: Arc<dyn DatasetStore>, config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        let retention = RetentionPolicy::new(config.max_datasets_per_owner)?;
        Ok(Self {
            store,
            config,
            retention,
            observer: None,
        })
    }

    /// Attach an observer for upload outcomes.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DatasetStore> {
        &self.store
    }

    /// Ingest one upload on behalf of `identity`.
    ///
    /// When an observer is configured this reports `on_committed` on success, and
    /// `on_failure` (plus `on_alert` at or above the configured threshold) on failure. The
    /// context handed to the observer carries the states the upload passed through, ending
    /// in [`UploadState::Failed`] on the failure path.
    pub fn upload(&self, identity: &Identity, upload: &UploadFile) -> PipelineResult<UploadOutcome> {
        let mut trace = UploadTrace::new();
        let result = self.run(identity, upload, &mut trace);
        if result.is_err() {
            trace.advance(UploadState::Failed);
        }

        if let Some(obs) = self.observer.as_ref() {
            let ctx = UploadContext {
                owner: identity.principal().cloned(),
                file_name: upload.file_name.clone(),
                trace: trace.clone(),
            };
            match &result {
                Ok((dataset, retention)) => obs.on_committed(
                    &ctx,
                    CommitStats {
                        dataset_id: dataset.id,
                        rows: dataset.total_count(),
                        evicted: retention.as_ref().map(|r| r.evicted.len()).unwrap_or(0),
                    },
                ),
                Err(e) => {
                    let sev = PipelineSeverity::for_error(e);
                    obs.on_failure(&ctx, sev, e);
                    if sev >= self.config.alert_at_or_above {
                        obs.on_alert(&ctx, sev, e);
                    }
                }
            }
        }

        result.map(|(dataset, retention)| UploadOutcome {
            dataset,
            retention,
            trace,
        })
    }

    fn run(
        &self,
        identity: &Identity,
        upload: &UploadFile,
        trace: &mut UploadTrace,
    ) -> PipelineResult<(Dataset, PipelineResult<RetentionReport>)> {
        let owner = identity.principal().ok_or(PipelineError::AuthRequired)?;

        let staged = self
            .stage(owner, upload, trace)
            .inspect_err(|e| self.log_failure(trace, owner, e))?;

        let id = staged.id;
        let dataset = self.commit(staged).inspect_err(|e| {
            self.compensate(id);
            self.log_failure(trace, owner, e);
        })?;
        trace.advance(UploadState::Committed);

        let retention = self.apply_retention(owner);
        trace.advance(UploadState::RetentionApplied);

        tracing::info!(
            owner = %owner,
            dataset_id = %dataset.id,
            rows = dataset.total_count(),
            "upload ingested"
        );
        Ok((dataset, retention))
    }

    /// Steps before any persistence: parse, validate, build records, aggregate.
    fn stage(&self, owner: &Principal, upload: &UploadFile, trace: &mut UploadTrace) -> PipelineResult<NewDataset> {
        let table = parse_upload(upload, self.config.max_upload_bytes)?;
        let rows = validate_table(&table)?;
        trace.advance(UploadState::Validated);

        let id = DatasetId::new();
        let aggregates = aggregate(&rows);
        let records: Vec<EquipmentRecord> =
            rows.into_iter().map(|r| EquipmentRecord::from_row(id, r)).collect();
        trace.advance(UploadState::RecordsBuilt);

        Ok(NewDataset {
            id,
            owner: owner.clone(),
            name: upload.display_name().to_owned(),
            file: FileBlob {
                file_name: upload.file_name.clone(),
                bytes: upload.bytes.clone(),
            },
            records,
            aggregates,
        })
    }

    /// Create, then confirm the stored record set matches the dataset's count.
    ///
    /// A dataset that is already gone again was evicted by a concurrent sweep for the same
    /// owner; that still counts as committed.
    fn commit(&self, new: NewDataset) -> PipelineResult<Dataset> {
        let dataset = self.store.create(new)?;
        let stored = self.store.record_count(dataset.id)?;
        if stored != dataset.total_count() && self.store.get(dataset.id)?.is_some() {
            return Err(PipelineError::persistence(format!(
                "dataset {} committed with {stored} records, expected {}",
                dataset.id,
                dataset.total_count()
            )));
        }
        Ok(dataset)
    }

    /// Remove whatever a failed commit left behind.
    fn compensate(&self, id: DatasetId) {
        match self.store.delete(id) {
            Ok(true) => tracing::warn!(dataset_id = %id, "rolled back partially created dataset"),
            Ok(false) => {}
            Err(e) => tracing::error!(dataset_id = %id, "rollback of partial dataset failed: {e}"),
        }
    }

    fn log_failure(&self, trace: &UploadTrace, owner: &Principal, error: &PipelineError) {
        tracing::debug!(
            owner = %owner,
            state = ?trace.current(),
            kind = ?error.kind(),
            "upload failed"
        );
    }

    /// Run a retention sweep for `owner`, reporting evictions to the observer.
    ///
    /// Also usable on its own to retry a sweep that previously failed.
    pub fn apply_retention(&self, owner: &Principal) -> PipelineResult<RetentionReport> {
        let result = self.retention.enforce(self.store.as_ref(), owner);
        match (&result, self.observer.as_ref()) {
            (Ok(report), Some(obs)) => {
                for id in &report.evicted {
                    obs.on_evicted(owner, *id);
                }
                for (id, e) in &report.failed {
                    obs.on_eviction_failed(owner, *id, e);
                }
            }
            (Err(e), _) => tracing::warn!(owner = %owner, "retention sweep failed: {e}"),
            _ => {}
        }
        result
    }

    /// The owner's datasets, newest first.
    pub fn list_datasets(&self, owner: &Principal) -> PipelineResult<Vec<DatasetListing>> {
        self.store
            .list_by_owner(owner)?
            .iter()
            .map(|d| Ok(DatasetListing::new(d, self.store.record_count(d.id)?)))
            .collect()
    }

    /// Fetch a dataset the owner holds. Other owners' datasets read as not found.
    pub fn get_dataset(&self, owner: &Principal, id: DatasetId) -> PipelineResult<Dataset> {
        match self.store.get(id)? {
            Some(d) if &d.owner == owner => Ok(d),
            _ => Err(PipelineError::NotFound {
                dataset_id: id.to_string(),
            }),
        }
    }

    /// The dataset's records, ordered by equipment name.
    pub fn records(&self, owner: &Principal, id: DatasetId) -> PipelineResult<Vec<EquipmentRecord>> {
        let dataset = self.get_dataset(owner, id)?;
        self.store.records(dataset.id)
    }

    pub fn summary(&self, owner: &Principal, id: DatasetId) -> PipelineResult<DatasetSummary> {
        let dataset = self.get_dataset(owner, id)?;
        let records = self.store.records(id)?;
        Ok(build_summary(&dataset, &records))
    }

    pub fn report(&self, owner: &Principal, id: DatasetId) -> PipelineResult<DatasetReport> {
        let dataset = self.get_dataset(owner, id)?;
        let records = self.store.records(id)?;
        Ok(build_report(&dataset, &records, Utc::now()))
    }

    /// Explicit deletion by the owner.
    ///
    /// Returns `Ok(false)` if the dataset is already gone. A dataset held by another
    /// owner is reported as not found and left untouched.
    pub fn delete_dataset(&self, owner: &Principal, id: DatasetId) -> PipelineResult<bool> {
        match self.store.get(id)? {
            None => Ok(false),
            Some(d) if &d.owner == owner => self.store.delete(id),
            Some(_) => Err(PipelineError::NotFound {
                dataset_id: id.to_string(),
            }),
        }
    }
}
