use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::{BuildConfig, FailurePolicy, DEFAULT_MAX_TASKS_PER_WORKER, DEFAULT_TIMEOUT_SECS};
use crate::db::StoreWriter;
use crate::pipeline::{NoProgress, PipelineError, ProgressReporter};
use crate::services::extraction::{ExtractionAdapter, ExtractionRequest, DEFAULT_DEPTH};

/// Scheduling knobs for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub concurrency: usize,
    pub per_file_timeout: Duration,
    pub use_symbol: bool,
    pub depth: u32,
    pub max_tasks_per_worker: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: num_cpus::get().max(1),
            per_file_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            use_symbol: false,
            depth: DEFAULT_DEPTH,
            max_tasks_per_worker: DEFAULT_MAX_TASKS_PER_WORKER,
            shuffle: true,
            seed: None,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            concurrency: config.effective_concurrency(),
            per_file_timeout: config.timeout(),
            use_symbol: config.use_symbol,
            depth: config.depth,
            max_tasks_per_worker: config.max_tasks_per_worker.max(1),
            shuffle: config.shuffle,
            seed: config.seed,
            failure_policy: config.failure_policy,
        }
    }
}

/// Counters for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub scheduled: usize,
    /// Files whose functions were written (including files with zero functions).
    pub processed: usize,
    pub functions_inserted: usize,
    /// Functions dropped because their file had no valid identity.
    pub functions_dropped: usize,
    /// Files that failed under [`FailurePolicy::SkipFile`].
    pub failed_files: Vec<PathBuf>,
}

enum WorkerExit {
    /// Queue empty or run cancelled.
    Drained,
    /// Hit the per-worker task budget; a fresh worker should take the slot.
    Recycled,
}

/// Drives per-file extraction across a bounded pool of workers.
///
/// Each worker takes one file at a time: extract under the deadline, write
/// every function through the [`StoreWriter`], release the backend, report
/// progress. With [`FailurePolicy::Abort`] the first timeout or extraction
/// error cancels every worker and the run returns that error.
pub struct Coordinator {
    adapter: Arc<dyn ExtractionAdapter>,
    writer: StoreWriter,
    options: PipelineOptions,
    progress: Arc<dyn ProgressReporter>,
}

impl Coordinator {
    pub fn new(
        adapter: Arc<dyn ExtractionAdapter>,
        writer: StoreWriter,
        options: PipelineOptions,
    ) -> Self {
        Self { adapter, writer, options, progress: Arc::new(NoProgress) }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Scheduling order for `candidates`.
    ///
    /// Shuffling spreads project/compiler/optimization clusters across the run
    /// so slow or failing clusters are not hit back to back. It carries no
    /// correctness guarantee.
    pub fn order(&self, mut candidates: Vec<PathBuf>) -> Vec<PathBuf> {
        if self.options.shuffle {
            match self.options.seed {
                Some(seed) => candidates.shuffle(&mut StdRng::seed_from_u64(seed)),
                None => candidates.shuffle(&mut rand::thread_rng()),
            }
        }
        candidates
    }

    /// Process every candidate. Returns on completion or on the first fatal error.
    pub async fn run(&self, candidates: Vec<PathBuf>) -> Result<RunStats, PipelineError> {
        let files = self.order(candidates);
        let total = files.len();
        self.progress.started(total);

        let ctx = Arc::new(WorkerContext {
            adapter: self.adapter.clone(),
            writer: self.writer.clone(),
            progress: self.progress.clone(),
            queue: Mutex::new(files.into_iter().collect()),
            cancel: CancellationToken::new(),
            total,
            per_file_timeout: self.options.per_file_timeout,
            use_symbol: self.options.use_symbol,
            depth: self.options.depth,
            max_tasks: self.options.max_tasks_per_worker.max(1),
            failure_policy: self.options.failure_policy,
            done: AtomicUsize::new(0),
            processed: AtomicUsize::new(0),
            inserted: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
            failed: Mutex::new(Vec::new()),
        });

        let pool_size = self.options.concurrency.max(1).min(total.max(1));
        let mut workers = JoinSet::new();
        for worker_id in 0..pool_size {
            workers.spawn(run_worker(ctx.clone(), worker_id));
        }
        let mut next_worker_id = pool_size;

        let mut failure: Option<PipelineError> = None;
        while let Some(joined) = workers.join_next().await {
            let err = match joined {
                Ok(Ok(WorkerExit::Drained)) => continue,
                Ok(Ok(WorkerExit::Recycled)) => {
                    if !ctx.cancel.is_cancelled() && ctx.has_pending() {
                        debug!(worker = next_worker_id, "starting replacement worker");
                        workers.spawn(run_worker(ctx.clone(), next_worker_id));
                        next_worker_id += 1;
                    }
                    continue;
                }
                Ok(Err(err)) => err,
                Err(join_err) if join_err.is_cancelled() => continue,
                Err(join_err) => PipelineError::Worker(join_err),
            };

            if failure.is_none() {
                error!("{}", err);
                ctx.cancel.cancel();
                workers.abort_all();
                failure = Some(err);
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }

        self.progress.finished();
        Ok(ctx.stats())
    }
}

struct WorkerContext {
    adapter: Arc<dyn ExtractionAdapter>,
    writer: StoreWriter,
    progress: Arc<dyn ProgressReporter>,
    queue: Mutex<VecDeque<PathBuf>>,
    cancel: CancellationToken,
    total: usize,
    per_file_timeout: Duration,
    use_symbol: bool,
    depth: u32,
    max_tasks: usize,
    failure_policy: FailurePolicy,
    done: AtomicUsize,
    processed: AtomicUsize,
    inserted: AtomicUsize,
    dropped: AtomicUsize,
    failed: Mutex<Vec<PathBuf>>,
}

impl WorkerContext {
    fn next_file(&self) -> Option<PathBuf> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front()
    }

    fn has_pending(&self) -> bool {
        !self.queue.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    fn file_done(&self, path: &Path) {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        self.progress.file_finished(done, self.total, path);
    }

    /// Apply the failure policy to an extraction failure for `path`.
    fn fail(&self, path: &Path, err: PipelineError) -> Result<(), PipelineError> {
        match self.failure_policy {
            FailurePolicy::Abort => {
                // Stop every other worker from picking up more files right away.
                self.cancel.cancel();
                Err(err)
            }
            FailurePolicy::SkipFile => {
                warn!("skipping file: {}", err);
                self.failed.lock().unwrap_or_else(|e| e.into_inner()).push(path.to_path_buf());
                self.file_done(path);
                Ok(())
            }
        }
    }

    async fn process(&self, path: &Path) -> Result<(), PipelineError> {
        let request = ExtractionRequest::new(path, self.use_symbol, self.depth);

        let extracted = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(()),
            res = tokio::time::timeout(self.per_file_timeout, self.adapter.extract(&request)) => res,
        };

        let functions = match extracted {
            Ok(Ok(functions)) => functions,
            Ok(Err(source)) => {
                return self
                    .fail(path, PipelineError::Extraction { path: path.to_path_buf(), source })
            }
            Err(_) => {
                return self.fail(
                    path,
                    PipelineError::Timeout {
                        path: path.to_path_buf(),
                        after: self.per_file_timeout,
                    },
                )
            }
        };

        if self.cancel.is_cancelled() {
            return Ok(());
        }

        let outcome = self.writer.insert_file(path, &functions).await.map_err(|source| {
            self.cancel.cancel();
            PipelineError::Store { path: path.to_path_buf(), source }
        })?;
        self.adapter.release(&request);

        self.processed.fetch_add(1, Ordering::SeqCst);
        self.inserted.fetch_add(outcome.inserted, Ordering::SeqCst);
        self.dropped.fetch_add(outcome.dropped, Ordering::SeqCst);
        self.file_done(path);
        Ok(())
    }

    fn stats(&self) -> RunStats {
        RunStats {
            scheduled: self.total,
            processed: self.processed.load(Ordering::SeqCst),
            functions_inserted: self.inserted.load(Ordering::SeqCst),
            functions_dropped: self.dropped.load(Ordering::SeqCst),
            failed_files: self.failed.lock().unwrap_or_else(|e| e.into_inner()).clone(),
        }
    }
}

async fn run_worker(ctx: Arc<WorkerContext>, worker_id: usize) -> Result<WorkerExit, PipelineError> {
    let mut handled = 0usize;
    loop {
        if ctx.cancel.is_cancelled() {
            return Ok(WorkerExit::Drained);
        }
        if handled >= ctx.max_tasks {
            debug!(worker = worker_id, handled, "worker reached its task budget");
            return Ok(WorkerExit::Recycled);
        }
        let Some(path) = ctx.next_file() else {
            return Ok(WorkerExit::Drained);
        };
        handled += 1;
        ctx.process(&path).await?;
    }
}
