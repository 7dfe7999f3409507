//! Extraction dispatch strategies.
//!
//! A [`Dispatcher`] runs one extraction per planned destination. Two
//! strategies sit behind the same interface:
//!
//! - [`PooledDispatcher`] spreads tasks over a fixed-size [`rayon`] thread
//!   pool; tasks run concurrently and finish in any order.
//! - [`SequentialDispatcher`] runs tasks one at a time in plan order, for
//!   reproducible debugging.
//!
//! Both are fail-soft: a failing (or panicking) extraction is logged and the
//! remaining tasks still run. Neither keeps a success ledger; what succeeded
//! is decided afterwards from the filesystem by the reconciler.
//!
//! A global timeout bounds how long the caller waits. Tasks always run off
//! the calling thread, so a hung extraction cannot block it. When it expires the
//! shared [`CancellationToken`] is triggered so no further tasks start, and
//! extractions already in flight are abandoned rather than killed.

use std::{
    any::Any,
    collections::HashSet,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::{
        Arc,
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::{Duration, Instant},
};

use rayon::{
    ThreadPoolBuilder,
    iter::{IntoParallelRefIterator, ParallelIterator},
};

use crate::{
    error::StillcutError,
    extractor::FrameExtractor,
    plan::{ExtractionTask, PlanIndex},
    progress::CancellationToken,
};

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every task reached a terminal state.
    Completed,
    /// The global timeout expired; unstarted tasks were skipped.
    TimedOut,
    /// The cancellation token was triggered by the caller.
    Cancelled,
}

/// Everything a dispatcher needs for one run.
///
/// Owns its data so a strategy can hand it to worker threads.
pub struct DispatchJob {
    video: PathBuf,
    tasks: Vec<ExtractionTask>,
    extractor: Arc<dyn FrameExtractor>,
    cancellation: CancellationToken,
    timeout: Duration,
}

impl DispatchJob {
    /// Build a job for every task in `plan`.
    ///
    /// Tasks sharing a destination with an earlier task are dropped, so at
    /// most one extraction ever targets a path.
    pub fn new<P: Into<PathBuf>>(
        video: P,
        plan: &PlanIndex,
        extractor: Arc<dyn FrameExtractor>,
    ) -> Self {
        let mut seen = HashSet::new();
        let tasks = plan
            .tasks()
            .iter()
            .filter(|task| {
                let first = seen.insert(task.destination.as_path());
                if !first {
                    log::warn!(
                        "Skipping duplicate destination {} (segment {})",
                        task.destination.display(),
                        task.segment_index
                    );
                }
                first
            })
            .cloned()
            .collect();

        Self {
            video: video.into(),
            tasks,
            extractor,
            cancellation: CancellationToken::new(),
            timeout: Duration::MAX,
        }
    }

    /// Share a cancellation token with the caller.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Bound how long the dispatcher waits for outstanding tasks.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of tasks that will be attempted.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

/// A dispatch strategy.
pub trait Dispatcher: Send + Sync {
    /// Attempt every task in `job` and report how the run ended.
    ///
    /// # Errors
    ///
    /// Only fails if the strategy cannot start at all (for example the
    /// worker pool cannot be built). Individual extraction failures are
    /// never returned.
    fn dispatch(&self, job: DispatchJob) -> Result<DispatchOutcome, StillcutError>;
}

/// Runs tasks on a fixed-size rayon thread pool.
#[derive(Debug, Clone, Copy)]
pub struct PooledDispatcher {
    max_workers: usize,
}

impl PooledDispatcher {
    /// Create a dispatcher with `max_workers` threads (at least one).
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// Configured pool size.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }
}

impl Dispatcher for PooledDispatcher {
    fn dispatch(&self, job: DispatchJob) -> Result<DispatchOutcome, StillcutError> {
        let DispatchJob {
            video,
            tasks,
            extractor,
            cancellation,
            timeout,
        } = job;

        log::info!(
            "Dispatching {} extraction(s) across {} worker(s)",
            tasks.len(),
            self.max_workers
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .thread_name(|index| format!("stillcut-worker-{index}"))
            .build()
            .map_err(|error| StillcutError::WorkerPool(error.to_string()))?;

        let worker_token = cancellation.clone();
        wait_for_dispatch("stillcut-dispatch", timeout, &cancellation, move || {
            pool.install(|| {
                tasks.par_iter().for_each(|task| {
                    run_task(&video, task, extractor.as_ref(), &worker_token);
                });
            });
            if worker_token.is_cancelled() {
                DispatchOutcome::Cancelled
            } else {
                DispatchOutcome::Completed
            }
        })
    }
}

/// Runs tasks one at a time, in plan order, on a single helper thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialDispatcher;

impl Dispatcher for SequentialDispatcher {
    fn dispatch(&self, job: DispatchJob) -> Result<DispatchOutcome, StillcutError> {
        let DispatchJob {
            video,
            tasks,
            extractor,
            cancellation,
            timeout,
        } = job;

        log::info!("Dispatching {} extraction(s) sequentially", tasks.len());

        let deadline = Instant::now().checked_add(timeout);
        let worker_token = cancellation.clone();

        wait_for_dispatch("stillcut-sequential", timeout, &cancellation, move || {
            for task in &tasks {
                if worker_token.is_cancelled() {
                    return DispatchOutcome::Cancelled;
                }
                if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    worker_token.cancel();
                    return DispatchOutcome::TimedOut;
                }
                run_task(&video, task, extractor.as_ref(), &worker_token);
            }
            DispatchOutcome::Completed
        })
    }
}

/// Run `work` on its own thread and wait for it at most `timeout`.
///
/// On expiry the token is cancelled and the thread is left to drain; the
/// task it is running is abandoned, not killed.
fn wait_for_dispatch<F>(
    thread_name: &str,
    timeout: Duration,
    cancellation: &CancellationToken,
    work: F,
) -> Result<DispatchOutcome, StillcutError>
where
    F: FnOnce() -> DispatchOutcome + Send + 'static,
{
    let (done_sender, done_receiver) = mpsc::channel();

    let _dispatch_thread = thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || {
            let _ = done_sender.send(work());
        })?;

    let outcome = match done_receiver.recv_timeout(timeout) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Disconnected) => {
            log::error!("Dispatch thread exited before signalling completion");
            if cancellation.is_cancelled() {
                DispatchOutcome::Cancelled
            } else {
                DispatchOutcome::Completed
            }
        }
        Err(RecvTimeoutError::Timeout) => DispatchOutcome::TimedOut,
    };

    if outcome == DispatchOutcome::TimedOut {
        cancellation.cancel();
        log::warn!("Extraction did not finish within {timeout:?}; abandoning outstanding tasks");
    }

    Ok(outcome)
}

/// Run one extraction, absorbing its error or panic.
fn run_task(
    video: &Path,
    task: &ExtractionTask,
    extractor: &dyn FrameExtractor,
    cancellation: &CancellationToken,
) {
    if cancellation.is_cancelled() {
        log::debug!("Skipping {} (cancelled)", task.destination.display());
        return;
    }

    log::debug!(
        "Extracting segment {} at {} -> {}",
        task.segment_index,
        task.timestamp,
        task.destination.display()
    );

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        extractor.extract(video, task.timestamp, &task.destination)
    }))
    .unwrap_or_else(|payload| Err(StillcutError::ExtractorPanicked(panic_message(&*payload))));

    match result {
        Ok(()) => log::debug!("Extracted {}", task.destination.display()),
        Err(error) => log::warn!(
            "Keyframe extraction failed for segment {} at {}: {error}",
            task.segment_index,
            task.timestamp
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
