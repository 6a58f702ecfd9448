use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Deserialize;

use crate::error::PipelineError;
use crate::pipeline::UploadTrace;
use crate::types::{DatasetId, Principal};

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal, e.g. a retention eviction that failed).
    Warning,
    /// Error-level event (the upload failed on its input).
    Error,
    /// Critical error (storage or other infrastructure failures).
    Critical,
}

impl PipelineSeverity {
    /// Severity of a failed upload.
    pub fn for_error(e: &PipelineError) -> Self {
        match e {
            PipelineError::Persistence { .. } | PipelineError::Io(_) => Self::Critical,
            PipelineError::Config { .. } => Self::Critical,
            PipelineError::AuthRequired
            | PipelineError::Schema { .. }
            | PipelineError::RowType { .. }
            | PipelineError::Parse { .. }
            | PipelineError::Rejected { .. }
            | PipelineError::NotFound { .. } => Self::Error,
        }
    }
}

/// Context about an upload attempt.
#[derive(Debug, Clone)]
pub struct UploadContext {
    /// Uploading principal; `None` for anonymous attempts.
    pub owner: Option<Principal>,
    /// Original file name.
    pub file_name: String,
    /// States the upload passed through; ends in `Failed` when the upload failed.
    pub trace: UploadTrace,
}

/// Stats reported on a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitStats {
    pub dataset_id: DatasetId,
    /// Number of committed equipment records.
    pub rows: usize,
    /// Number of older datasets evicted by retention afterwards.
    pub evicted: usize,
}

/// Observer interface for pipeline outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait PipelineObserver: Send + Sync {
    /// Called when an upload commits (after retention ran).
    fn on_committed(&self, _ctx: &UploadContext, _stats: CommitStats) {}

    /// Called when an upload fails.
    fn on_failure(&self, _ctx: &UploadContext, _severity: PipelineSeverity, _error: &PipelineError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &UploadContext, severity: PipelineSeverity, error: &PipelineError) {
        self.on_failure(ctx, severity, error)
    }

    /// Called for each dataset removed by retention.
    fn on_evicted(&self, _owner: &Principal, _dataset_id: DatasetId) {}

    /// Called when retention could not remove a dataset. The triggering upload still succeeds.
    fn on_eviction_failed(&self, _owner: &Principal, _dataset_id: DatasetId, _error: &PipelineError) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_committed(&self, ctx: &UploadContext, stats: CommitStats) {
        for o in &self.observers {
            o.on_committed(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &UploadContext, severity: PipelineSeverity, error: &PipelineError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &UploadContext, severity: PipelineSeverity, error: &PipelineError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }

    fn on_evicted(&self, owner: &Principal, dataset_id: DatasetId) {
        for o in &self.observers {
            o.on_evicted(owner, dataset_id);
        }
    }

    fn on_eviction_failed(&self, owner: &Principal, dataset_id: DatasetId, error: &PipelineError) {
        for o in &self.observers {
            o.on_eviction_failed(owner, dataset_id, error);
        }
    }
}

/// Emits pipeline events as structured `tracing` events.
#[derive(Debug, Default)]
pub struct LogObserver;

fn owner_label(ctx: &UploadContext) -> &str {
    ctx.owner.as_ref().map(Principal::as_str).unwrap_or("<anonymous>")
}

impl PipelineObserver for LogObserver {
    fn on_committed(&self, ctx: &UploadContext, stats: CommitStats) {
        tracing::info!(
            owner = owner_label(ctx),
            file = %ctx.file_name,
            dataset_id = %stats.dataset_id,
            rows = stats.rows,
            evicted = stats.evicted,
            "upload committed"
        );
    }

    fn on_failure(&self, ctx: &UploadContext, severity: PipelineSeverity, error: &PipelineError) {
        tracing::warn!(
            owner = owner_label(ctx),
            file = %ctx.file_name,
            states = ?ctx.trace.states(),
            severity = ?severity,
            kind = ?error.kind(),
            "upload failed: {error}"
        );
    }

    fn on_alert(&self, ctx: &UploadContext, severity: PipelineSeverity, error: &PipelineError) {
        tracing::error!(
            owner = owner_label(ctx),
            file = %ctx.file_name,
            severity = ?severity,
            kind = ?error.kind(),
            "ALERT upload failed: {error}"
        );
    }

    fn on_evicted(&self, owner: &Principal, dataset_id: DatasetId) {
        tracing::info!(owner = %owner, dataset_id = %dataset_id, "retention evicted dataset");
    }

    fn on_eviction_failed(&self, owner: &Principal, dataset_id: DatasetId, error: &PipelineError) {
        tracing::warn!(owner = %owner, dataset_id = %dataset_id, "retention eviction failed: {error}");
    }
}

/// Appends pipeline events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{} {line}", Utc::now().to_rfc3339());
        }
    }
}

impl PipelineObserver for FileObserver {
    fn on_committed(&self, ctx: &UploadContext, stats: CommitStats) {
        self.append_line(&format!(
            "ok owner={} file={} dataset={} rows={} evicted={}",
            owner_label(ctx),
            ctx.file_name,
            stats.dataset_id,
            stats.rows,
            stats.evicted
        ));
    }

    fn on_failure(&self, ctx: &UploadContext, severity: PipelineSeverity, error: &PipelineError) {
        self.append_line(&format!(
            "fail severity={:?} owner={} file={} err={}",
            severity,
            owner_label(ctx),
            ctx.file_name,
            error
        ));
    }

    fn on_alert(&self, ctx: &UploadContext, severity: PipelineSeverity, error: &PipelineError) {
        self.append_line(&format!(
            "ALERT severity={:?} owner={} file={} err={}",
            severity,
            owner_label(ctx),
            ctx.file_name,
            error
        ));
    }

    fn on_evicted(&self, owner: &Principal, dataset_id: DatasetId) {
        self.append_line(&format!("evicted owner={owner} dataset={dataset_id}"));
    }

    fn on_eviction_failed(&self, owner: &Principal, dataset_id: DatasetId, error: &PipelineError) {
        self.append_line(&format!(
            "eviction_failed severity={:?} owner={owner} dataset={dataset_id} err={error}",
            PipelineSeverity::Warning
        ));
    }
}
