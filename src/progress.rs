//! Progress observation and cancellation.
//!
//! Progress is never tracked as shared state. A [`ProgressObserver`] runs
//! on its own thread next to the dispatcher and periodically counts the
//! keyframe files present in the output directory; the directory listing is
//! the only progress signal. Whenever the count grows, an immutable
//! [`ProgressEvent`] is delivered to the configured [`ProgressCallback`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use stillcut::{ProgressCallback, ProgressEvent, ProgressObserver, ProgressRange};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, event: &ProgressEvent) {
//!         println!("[{:.1}%] {}", event.percentage, event.message);
//!     }
//! }
//!
//! let handle = ProgressObserver::new("keyframes", 42)
//!     .with_range(ProgressRange::new(17.0, 20.0))
//!     .with_callback(Arc::new(PrintProgress))
//!     .spawn()?;
//!
//! // ... dispatch extraction work ...
//!
//! let summary = handle.finish();
//! println!("saw {} keyframe(s)", summary.completed);
//! # Ok::<(), stillcut::StillcutError>(())
//! ```

use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{error::StillcutError, plan::is_keyframe_filename};

/// An immutable progress snapshot.
///
/// Only emitted when `completed` has grown since the previous event.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Keyframe files observed in the output directory.
    pub completed: usize,
    /// Keyframes the plan expects. Fixed for the whole run.
    pub total_expected: usize,
    /// `completed / total_expected` mapped into the configured
    /// [`ProgressRange`].
    pub percentage: f32,
    /// Human-readable summary.
    pub message: String,
}

/// The slice of an outer pipeline's progress bar this stage occupies.
///
/// A stage spanning 17%-20% of a larger job maps 0 keyframes to `17.0` and
/// all keyframes to `20.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRange {
    /// Percentage reported at zero completion.
    pub start: f32,
    /// Percentage reported at full completion.
    pub end: f32,
}

impl ProgressRange {
    /// Create a range from `start` to `end` percent.
    pub fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    /// Map a completion count into this range.
    ///
    /// Counts above `total` are clamped; `total == 0` maps to `end`.
    pub fn map(&self, completed: usize, total: usize) -> f32 {
        if total == 0 {
            return self.end;
        }
        let fraction = (completed as f32 / total as f32).min(1.0);
        self.start + (self.end - self.start) * fraction
    }
}

impl Default for ProgressRange {
    fn default() -> Self {
        Self::new(0.0, 100.0)
    }
}

/// Trait for receiving progress events.
///
/// Implementations must be [`Send`] and [`Sync`] because events are
/// delivered from the observer thread.
///
/// Callbacks are **infallible**: they observe but cannot halt the run. Use
/// [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called each time the observed keyframe count increases.
    fn on_progress(&self, event: &ProgressEvent);
}

/// Discards all progress events. The default when no callback is set.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone the token and share it between threads; [`cancel`](CancellationToken::cancel)
/// stops the dispatcher from starting further extractions. Extractions
/// already running finish on their own.
///
/// # Example
///
/// ```
/// use stillcut::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotone progress state: turns raw directory counts into events.
///
/// A count that is not above the last reported one produces nothing, so
/// files disappearing mid-run never move progress backwards.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_expected: usize,
    range: ProgressRange,
    completed: usize,
}

impl ProgressTracker {
    /// Create a tracker for a plan of `total_expected` keyframes.
    pub fn new(total_expected: usize, range: ProgressRange) -> Self {
        Self {
            total_expected,
            range,
            completed: 0,
        }
    }

    /// Highest count reported so far.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Feed a fresh directory count; returns an event if it grew.
    pub fn observe(&mut self, count: usize) -> Option<ProgressEvent> {
        if count <= self.completed {
            return None;
        }
        self.completed = count;

        Some(ProgressEvent {
            completed: count,
            total_expected: self.total_expected,
            percentage: self.range.map(count, self.total_expected),
            message: format!("Extracted {count}/{} keyframe(s)", self.total_expected),
        })
    }
}

/// Count directory entries whose names match the keyframe pattern.
///
/// # Errors
///
/// Returns the underlying I/O error, `NotFound` if the directory does not
/// exist yet.
pub fn count_keyframes(directory: &Path) -> io::Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if entry.file_name().to_str().is_some_and(is_keyframe_filename) {
            count += 1;
        }
    }
    Ok(count)
}

/// What the observer saw by the time it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObservationSummary {
    /// Highest keyframe count observed.
    pub completed: usize,
    /// Number of events delivered to the callback.
    pub events_emitted: usize,
    /// The output directory never appeared within the grace period.
    pub directory_missing: bool,
}

/// Filesystem-polling progress observer.
///
/// Build one with [`ProgressObserver::new`], configure it, then
/// [`spawn`](ProgressObserver::spawn) it alongside the dispatcher.
pub struct ProgressObserver {
    directory: PathBuf,
    total_expected: usize,
    range: ProgressRange,
    poll_interval: Duration,
    directory_grace: Duration,
    stall_warning_after: Duration,
    callback: Arc<dyn ProgressCallback>,
}

impl ProgressObserver {
    /// Observe `directory` for a plan of `total_expected` keyframes.
    ///
    /// Defaults: full 0-100 range, 2 s polling, 10 s directory grace,
    /// stall warning after 60 s without progress, no-op callback.
    pub fn new<P: Into<PathBuf>>(directory: P, total_expected: usize) -> Self {
        Self {
            directory: directory.into(),
            total_expected,
            range: ProgressRange::default(),
            poll_interval: Duration::from_secs(2),
            directory_grace: Duration::from_secs(10),
            stall_warning_after: Duration::from_secs(60),
            callback: Arc::new(NoOpProgress),
        }
    }

    /// Set the outer progress range events are mapped into.
    #[must_use]
    pub fn with_range(mut self, range: ProgressRange) -> Self {
        self.range = range;
        self
    }

    /// Set how often the directory is listed.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set how long the directory may be missing before the observer gives up.
    #[must_use]
    pub fn with_directory_grace(mut self, grace: Duration) -> Self {
        self.directory_grace = grace;
        self
    }

    /// Set how long the count may stay flat before a stall warning.
    #[must_use]
    pub fn with_stall_warning_after(mut self, after: Duration) -> Self {
        self.stall_warning_after = after;
        self
    }

    /// Attach the callback events are delivered to.
    #[must_use]
    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.callback = callback;
        self
    }

    /// Start polling on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns [`StillcutError::IoError`] if the thread cannot be spawned.
    pub fn spawn(self) -> Result<ObserverHandle, StillcutError> {
        let (stop_sender, stop_receiver) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("stillcut-observer".to_string())
            .spawn(move || self.run(&stop_receiver))?;

        Ok(ObserverHandle {
            stop: stop_sender,
            thread,
        })
    }

    fn run(self, stop: &Receiver<()>) -> ObservationSummary {
        let mut state = ObserverState {
            tracker: ProgressTracker::new(self.total_expected, self.range),
            started: Instant::now(),
            last_advance: Instant::now(),
            stall_reported: false,
            directory_seen: false,
            events_emitted: 0,
        };

        loop {
            if !self.sample(&mut state) {
                log::warn!(
                    "Output directory {} did not appear within {:?}; no longer observing progress",
                    self.directory.display(),
                    self.directory_grace
                );
                return state.summary(true);
            }

            match stop.recv_timeout(self.poll_interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    self.sample(&mut state);
                    return state.summary(!state.directory_seen);
                }
            }
        }
    }

    /// Take one sample. Returns `false` once the directory grace has expired.
    fn sample(&self, state: &mut ObserverState) -> bool {
        let count = match count_keyframes(&self.directory) {
            Ok(count) => count,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return state.directory_seen || state.started.elapsed() < self.directory_grace;
            }
            Err(error) => {
                log::warn!("Failed to list {}: {error}", self.directory.display());
                return true;
            }
        };
        state.directory_seen = true;

        if let Some(event) = state.tracker.observe(count) {
            log::debug!("{}", event.message);
            self.callback.on_progress(&event);
            state.events_emitted += 1;
            state.last_advance = Instant::now();
            state.stall_reported = false;
        } else if !state.stall_reported
            && state.tracker.completed() < self.total_expected
            && state.last_advance.elapsed() >= self.stall_warning_after
        {
            log::warn!(
                "No new keyframes for {:?} ({}/{} so far)",
                self.stall_warning_after,
                state.tracker.completed(),
                self.total_expected
            );
            state.stall_reported = true;
        }

        true
    }
}

struct ObserverState {
    tracker: ProgressTracker,
    started: Instant,
    last_advance: Instant,
    stall_reported: bool,
    directory_seen: bool,
    events_emitted: usize,
}

impl ObserverState {
    fn summary(&self, directory_missing: bool) -> ObservationSummary {
        ObservationSummary {
            completed: self.tracker.completed(),
            events_emitted: self.events_emitted,
            directory_missing,
        }
    }
}

/// Handle to a running [`ProgressObserver`].
pub struct ObserverHandle {
    stop: Sender<()>,
    thread: JoinHandle<ObservationSummary>,
}

impl ObserverHandle {
    /// Signal that dispatch is over, take a final sample, and join.
    pub fn finish(self) -> ObservationSummary {
        // The observer may already have exited after its grace period.
        let _ = self.stop.send(());
        match self.thread.join() {
            Ok(summary) => summary,
            Err(_) => {
                log::error!("Progress observer thread panicked");
                ObservationSummary::default()
            }
        }
    }
}
