use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Events emitted by the [`super::UploadExecutor`].
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted { uploads: usize },
    ThrottleWaited { duration: Duration },
    UploadStarted { index: usize },
    UploadFinished { index: usize, committed: bool },
    RunFinished {
        elapsed: Duration,
        metrics: ExecutionMetricsSnapshot,
    },
}

/// Observer hook for execution events.
pub trait ExecutionObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// Forwards execution events to `tracing` at debug level.
#[derive(Debug, Default)]
pub struct LogExecutionObserver;

impl ExecutionObserver for LogExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        tracing::debug!(?event, "upload executor");
    }
}

/// Real-time counters for an execution run.
///
/// The executor updates these while uploads run; callers can snapshot them at any time.
#[derive(Debug, Default)]
pub struct ExecutionMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    uploads_started: AtomicU64,
    uploads_committed: AtomicU64,
    uploads_failed: AtomicU64,
    throttle_wait_ns: AtomicU64,

    active_uploads: AtomicUsize,
    max_active_uploads: AtomicUsize,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);
        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.uploads_started.store(0, Ordering::SeqCst);
        self.uploads_committed.store(0, Ordering::SeqCst);
        self.uploads_failed.store(0, Ordering::SeqCst);
        self.throttle_wait_ns.store(0, Ordering::SeqCst);
        self.active_uploads.store(0, Ordering::SeqCst);
        self.max_active_uploads.store(0, Ordering::SeqCst);
    }

    pub(crate) fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub(crate) fn on_upload_start(&self) {
        let _ = self.uploads_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_uploads.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_uploads, now);
    }

    pub(crate) fn on_upload_end(&self, committed: bool) {
        let counter = if committed {
            &self.uploads_committed
        } else {
            &self.uploads_failed
        };
        let _ = counter.fetch_add(1, Ordering::SeqCst);
        let _ = self.active_uploads.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn on_throttle_wait(&self, d: Duration) {
        let add = d.as_nanos().min(u64::MAX as u128) as u64;
        let _ = self.throttle_wait_ns.fetch_add(add, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ExecutionMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        ExecutionMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed: (elapsed_ns > 0).then(|| Duration::from_nanos(elapsed_ns)),
            uploads_started: self.uploads_started.load(Ordering::SeqCst),
            uploads_committed: self.uploads_committed.load(Ordering::SeqCst),
            uploads_failed: self.uploads_failed.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            max_active_uploads: self.max_active_uploads.load(Ordering::SeqCst),
        }
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    let _ = dst.fetch_max(now, Ordering::SeqCst);
}

/// Immutable snapshot of [`ExecutionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub uploads_started: u64,
    pub uploads_committed: u64,
    pub uploads_failed: u64,
    pub throttle_wait: Duration,
    pub max_active_uploads: usize,
}

impl fmt::Display for ExecutionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, uploads={}/{} committed, failed={}, max_active_uploads={}, throttle_wait={:?}, elapsed={:?}",
            self.run_id,
            self.uploads_committed,
            self.uploads_started,
            self.uploads_failed,
            self.max_active_uploads,
            self.throttle_wait,
            self.elapsed
        )
    }
}
