//! Run configuration.
//!
//! [`ExtractOptions`] is a builder that threads concurrency, timing,
//! progress and sampling settings through a [`KeyframeJob`](crate::KeyframeJob)
//! without widening every signature.
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use stillcut::{ExtractOptions, ProgressCallback, ProgressEvent, ProgressRange};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, event: &ProgressEvent) {
//!         println!("{}", event.message);
//!     }
//! }
//!
//! let options = ExtractOptions::new()
//!     .with_max_workers(8)
//!     .with_timeout(Duration::from_secs(600))
//!     .with_progress_range(ProgressRange::new(17.0, 20.0))
//!     .with_progress(Arc::new(LogProgress));
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
    time::Duration,
};

use crate::{
    dispatch::{Dispatcher, PooledDispatcher, SequentialDispatcher},
    error::StillcutError,
    progress::{CancellationToken, NoOpProgress, ProgressCallback, ProgressRange},
    sampling::SamplingOptions,
};

/// Configuration for a keyframe extraction run.
///
/// All fields have defaults matching a typical batch: four workers, a
/// fifty-minute global timeout, two-second progress polling.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) max_workers: usize,
    pub(crate) sequential: bool,
    pub(crate) timeout: Duration,
    pub(crate) poll_interval: Duration,
    pub(crate) directory_grace: Duration,
    pub(crate) stall_warning_after: Duration,
    pub(crate) progress_range: ProgressRange,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) sampling: Option<SamplingOptions>,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("max_workers", &self.max_workers)
            .field("sequential", &self.sequential)
            .field("timeout", &self.timeout)
            .field("poll_interval", &self.poll_interval)
            .field("directory_grace", &self.directory_grace)
            .field("stall_warning_after", &self.stall_warning_after)
            .field("progress_range", &self.progress_range)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("sampling", &self.sampling)
            .finish()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            max_workers: 4,
            sequential: false,
            timeout: Duration::from_secs(3000),
            poll_interval: Duration::from_secs(2),
            directory_grace: Duration::from_secs(10),
            stall_warning_after: Duration::from_secs(60),
            progress_range: ProgressRange::default(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            sampling: None,
        }
    }

    /// Number of pool workers in parallel mode. Must be greater than zero.
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Run extractions one at a time, in plan order.
    #[must_use]
    pub fn with_sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    /// Bound how long to wait for dispatch before reconciling anyway.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How often the progress observer lists the output directory.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// How long the output directory may be missing before the observer
    /// stops with a stall warning.
    #[must_use]
    pub fn with_directory_grace(mut self, grace: Duration) -> Self {
        self.directory_grace = grace;
        self
    }

    /// How long progress may stay flat before a stall warning is logged.
    #[must_use]
    pub fn with_stall_warning_after(mut self, after: Duration) -> Self {
        self.stall_warning_after = after;
        self
    }

    /// Map progress into a slice of an outer pipeline's range.
    #[must_use]
    pub fn with_progress_range(mut self, range: ProgressRange) -> Self {
        self.progress_range = range;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// Cancelling it stops further extractions from starting. The run then
    /// reconciles whatever was produced. The token is also cancelled when
    /// the global timeout expires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Re-derive extraction times from segment spans before planning.
    #[must_use]
    pub fn with_sampling(mut self, sampling: SamplingOptions) -> Self {
        self.sampling = Some(sampling);
        self
    }

    /// Check option values.
    ///
    /// # Errors
    ///
    /// Returns [`StillcutError::InvalidConfiguration`] for a zero worker
    /// count, a zero poll interval, a non-finite or inverted progress range,
    /// or invalid sampling parameters.
    pub fn validate(&self) -> Result<(), StillcutError> {
        if self.max_workers == 0 {
            return Err(StillcutError::InvalidConfiguration(
                "max workers must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(StillcutError::InvalidConfiguration(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        let range = self.progress_range;
        if !range.start.is_finite() || !range.end.is_finite() || range.start > range.end {
            return Err(StillcutError::InvalidConfiguration(format!(
                "progress range {}..{} is not ascending",
                range.start, range.end
            )));
        }
        if let Some(sampling) = &self.sampling {
            sampling.validate()?;
        }
        Ok(())
    }

    /// The dispatch strategy these options select.
    pub fn dispatcher(&self) -> Box<dyn Dispatcher> {
        if self.sequential {
            Box::new(SequentialDispatcher)
        } else {
            Box::new(PooledDispatcher::new(self.max_workers))
        }
    }

    /// Whether sequential mode is selected.
    pub fn is_sequential(&self) -> bool {
        self.sequential
    }

    /// Configured worker count.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }
}
