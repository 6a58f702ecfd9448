//! Offloading uploads onto a bounded worker pool.
//!
//! Each upload still runs the full pipeline as one unit; the executor only decides where
//! and how many run at the same time. It provides:
//!
//! - parallel execution of independent uploads on a `rayon` pool
//! - an in-flight limit (throttling) on top of the thread count
//! - real-time metrics + observer hooks for monitoring

mod observer;
mod semaphore;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{PipelineError, PipelineResult};
use crate::ingestion::upload::UploadFile;
use crate::pipeline::{IngestionPipeline, UploadOutcome};
use crate::types::Identity;

pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver, LogExecutionObserver,
};

use semaphore::Semaphore;

/// Configuration for the [`UploadExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Number of worker threads.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Upper bound on concurrently running uploads.
    pub max_in_flight_uploads: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            num_threads: Some(n),
            max_in_flight_uploads: n.max(1),
        }
    }
}

/// One queued upload.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub identity: Identity,
    pub upload: UploadFile,
}

impl UploadJob {
    pub fn new(identity: impl Into<Identity>, upload: UploadFile) -> Self {
        Self {
            identity: identity.into(),
            upload,
        }
    }
}

/// Runs batches of uploads through an [`IngestionPipeline`] in parallel.
pub struct UploadExecutor {
    pool: ThreadPool,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
}

impl fmt::Debug for UploadExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadExecutor")
            .field("opts", &self.opts)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

impl UploadExecutor {
    /// Create a new executor.
    ///
    /// Fails with [`PipelineError::Config`] if `max_in_flight_uploads == 0` or
    /// `num_threads == Some(0)`.
    pub fn new(opts: ExecutionOptions) -> PipelineResult<Self> {
        if opts.max_in_flight_uploads == 0 {
            return Err(PipelineError::config("max_in_flight_uploads must be > 0"));
        }
        if opts.num_threads == Some(0) {
            return Err(PipelineError::config("num_threads must be > 0 when set"));
        }

        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));

        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| PipelineError::config(format!("failed to build worker pool: {e}")))?;

        Ok(Self {
            pool,
            opts,
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        })
    }

    /// Attach an observer for execution events.
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time execution metrics.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run every job; results come back in job order.
    pub fn run_batch(
        &self,
        pipeline: &IngestionPipeline,
        jobs: &[UploadJob],
    ) -> Vec<PipelineResult<UploadOutcome>> {
        self.pool.install(|| self.run_batch_impl(pipeline, jobs))
    }

    fn run_batch_impl(
        &self,
        pipeline: &IngestionPipeline,
        jobs: &[UploadJob],
    ) -> Vec<PipelineResult<UploadOutcome>> {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted { uploads: jobs.len() });

        let sem = Semaphore::new(self.opts.max_in_flight_uploads);
        let out: Vec<PipelineResult<UploadOutcome>> = jobs
            .par_iter()
            .enumerate()
            .map(|(index, job)| {
                let (_permit, waited) = sem.acquire();
                if waited > Duration::ZERO {
                    self.metrics.on_throttle_wait(waited);
                    self.emit(ExecutionEvent::ThrottleWaited { duration: waited });
                }

                self.metrics.on_upload_start();
                self.emit(ExecutionEvent::UploadStarted { index });

                let result = pipeline.upload(&job.identity, &job.upload);

                let committed = result.is_ok();
                self.emit(ExecutionEvent::UploadFinished { index, committed });
                self.metrics.on_upload_end(committed);
                result
            })
            .collect();

        self.metrics.end_run(start.elapsed());
        self.emit(ExecutionEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });
        out
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{ExecutionEvent, ExecutionObserver, ExecutionOptions, UploadExecutor, UploadJob};
    use crate::config::PipelineConfig;
    use crate::error::ErrorKind;
    use crate::ingestion::UploadFile;
    use crate::pipeline::IngestionPipeline;
    use crate::store::{MemoryBlobStore, MemoryDatasetStore};
    use crate::types::{Identity, Principal};

    const CSV: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\nP-1,Pump,10,2,30\n";

    fn pipeline() -> IngestionPipeline {
        let store = Arc::new(MemoryDatasetStore::new(Arc::new(MemoryBlobStore::new())));
        IngestionPipeline::new(
            store,
            PipelineConfig {
                max_datasets_per_owner: 100,
                ..Default::default()
            },
        )
        .unwrap()
    }

    struct ConcurrencyObserver {
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl ExecutionObserver for ConcurrencyObserver {
        fn on_event(&self, event: &ExecutionEvent) {
            match event {
                ExecutionEvent::UploadStarted { .. } => {
                    let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                    self.max_active.fetch_max(now, Ordering::SeqCst);
                }
                ExecutionEvent::UploadFinished { .. } => {
                    let _ = self.active.fetch_sub(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn zero_in_flight_limit_is_a_config_error() {
        let err = UploadExecutor::new(ExecutionOptions {
            num_threads: Some(2),
            max_in_flight_uploads: 0,
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn results_keep_job_order_and_failures_stay_isolated() {
        let pipeline = pipeline();
        let exec = UploadExecutor::new(ExecutionOptions {
            num_threads: Some(4),
            max_in_flight_uploads: 4,
        })
        .unwrap();

        let jobs = vec![
            UploadJob::new(Principal::new("a"), UploadFile::new("a.csv", CSV)),
            UploadJob {
                identity: Identity::Anonymous,
                upload: UploadFile::new("b.csv", CSV),
            },
            UploadJob::new(Principal::new("c"), UploadFile::new("c.txt", CSV)),
            UploadJob::new(Principal::new("d"), UploadFile::new("d.csv", CSV)),
        ];
        let results = exec.run_batch(&pipeline, &jobs);

        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().kind(), ErrorKind::AuthRequired);
        assert_eq!(results[2].as_ref().unwrap_err().kind(), ErrorKind::Rejected);
        assert!(results[3].is_ok());

        let snap = exec.metrics().snapshot();
        assert_eq!(snap.uploads_started, 4);
        assert_eq!(snap.uploads_committed, 2);
        assert_eq!(snap.uploads_failed, 2);
        assert!(snap.elapsed.is_some());
    }

    #[test]
    fn in_flight_limit_throttles_upload_concurrency() {
        let pipeline = pipeline();
        let observer = Arc::new(ConcurrencyObserver {
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        });
        let obs_trait: Arc<dyn ExecutionObserver> = observer.clone();
        let exec = UploadExecutor::new(ExecutionOptions {
            num_threads: Some(4),
            max_in_flight_uploads: 1,
        })
        .unwrap()
        .with_observer(obs_trait);

        let jobs: Vec<UploadJob> = (0..20)
            .map(|i| UploadJob::new(Principal::new("alice"), UploadFile::new(format!("{i}.csv"), CSV)))
            .collect();
        let results = exec.run_batch(&pipeline, &jobs);

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(observer.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(exec.metrics().snapshot().max_active_uploads, 1);
        assert_eq!(pipeline.list_datasets(&Principal::new("alice")).unwrap().len(), 20);
    }
}
