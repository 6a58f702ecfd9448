//! Per-owner retention: keep the newest `N` datasets, evict the rest oldest-first.

use crate::config::retention_cap;
use crate::error::{PipelineError, PipelineResult};
use crate::store::DatasetStore;
use crate::types::{DatasetId, Principal};

/// Bounded-size retention policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_per_owner: usize,
}

/// Outcome of one retention sweep.
#[derive(Debug, Default)]
pub struct RetentionReport {
    /// Datasets the owner still holds (as seen by this sweep).
    pub kept: usize,
    /// Datasets this sweep deleted, oldest first.
    pub evicted: Vec<DatasetId>,
    /// Datasets that were already gone when this sweep reached them.
    pub already_gone: Vec<DatasetId>,
    /// Deletes that failed; they can be retried by a later sweep.
    pub failed: Vec<(DatasetId, PipelineError)>,
}

impl RetentionReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl RetentionPolicy {
    /// Create a policy. A cap below 1 is a configuration error.
    pub fn new(max_per_owner: i64) -> PipelineResult<Self> {
        Ok(Self {
            max_per_owner: retention_cap(max_per_owner)?,
        })
    }

    pub fn max_per_owner(&self) -> usize {
        self.max_per_owner
    }

    /// Evict every dataset of `owner` beyond the newest `max_per_owner`, oldest first.
    ///
    /// Only a failure to list the owner's datasets is returned as an error; individual
    /// delete failures are collected in the report. Safe to run concurrently for the same
    /// owner: a dataset deleted by someone else is recorded as already gone.
    pub fn enforce(&self, store: &dyn DatasetStore, owner: &Principal) -> PipelineResult<RetentionReport> {
        let datasets = store.list_by_owner(owner)?;
        let mut report = RetentionReport {
            kept: datasets.len().min(self.max_per_owner),
            ..Default::default()
        };
        if datasets.len() <= self.max_per_owner {
            return Ok(report);
        }

        for ds in datasets[self.max_per_owner..].iter().rev() {
            match store.delete(ds.id) {
                Ok(true) => report.evicted.push(ds.id),
                Ok(false) => report.already_gone.push(ds.id),
                Err(e) => {
                    tracing::warn!(owner = %owner, dataset_id = %ds.id, "eviction failed: {e}");
                    report.failed.push((ds.id, e));
                }
            }
        }

        tracing::debug!(
            owner = %owner,
            kept = report.kept,
            evicted = report.evicted.len(),
            failed = report.failed.len(),
            "retention sweep finished"
        );
        Ok(report)
    }
}
