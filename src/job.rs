//! Core [`KeyframeJob`] implementation.
//!
//! `KeyframeJob` is the main entry point for the crate. It ties the stages
//! together in a fixed order:
//!
//! 1. input checks and optional re-sampling of extraction times,
//! 2. output directory preparation (nothing is written before this),
//! 3. path planning,
//! 4. dispatch, with a progress observer watching the output directory,
//! 5. reconciliation against the filesystem.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use stillcut::{ExtractOptions, FfmpegExtractor, KeyframeJob};
//!
//! let report = KeyframeJob::from_match_file("input.mp4", "match.json", "keyframes")?
//!     .with_options(ExtractOptions::new().with_max_workers(8))
//!     .run(Arc::new(FfmpegExtractor::new()?))?;
//!
//! println!(
//!     "{}: {}/{} keyframes",
//!     report.status, report.successful_extractions, report.total_expected
//! );
//! std::process::exit(report.exit_code());
//! # Ok::<(), stillcut::StillcutError>(())
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Serialize;

use crate::{
    configuration::ExtractOptions,
    dispatch::{DispatchJob, DispatchOutcome},
    error::StillcutError,
    extractor::FrameExtractor,
    plan::plan,
    progress::ProgressObserver,
    reconcile::{ExtractionStatus, reconcile},
    sampling::resample_segments,
    segment::{Segment, load_match_data},
};

const WRITE_PROBE_NAME: &str = ".stillcut-write-probe";

/// Final result of a run, handed back to the caller.
///
/// `segments` is the input match data with every path list pruned to the
/// keyframes that exist on disk.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    /// Overall classification.
    pub status: ExtractionStatus,
    /// Keyframes the plan expected.
    pub total_expected: usize,
    /// Planned keyframes found on disk.
    pub successful_extractions: usize,
    /// Planned keyframes missing from disk.
    pub failed_extractions: usize,
    /// How dispatch ended.
    #[serde(skip)]
    pub dispatch: DispatchOutcome,
    /// Pruned segments.
    pub segments: Vec<Segment>,
}

impl ExtractionReport {
    /// Process exit code for this report: `0`, `1` or `2`.
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

/// A configured keyframe extraction run over one video.
#[derive(Debug)]
pub struct KeyframeJob {
    video_path: PathBuf,
    output_dir: PathBuf,
    segments: Vec<Segment>,
    options: ExtractOptions,
}

impl KeyframeJob {
    /// Prepare a run over already-loaded segments.
    pub fn new<V, O>(video_path: V, output_dir: O, segments: Vec<Segment>) -> Self
    where
        V: Into<PathBuf>,
        O: Into<PathBuf>,
    {
        Self {
            video_path: video_path.into(),
            output_dir: output_dir.into(),
            segments,
            options: ExtractOptions::default(),
        }
    }

    /// Prepare a run from a match file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`StillcutError::MatchData`] if the file cannot be read or
    /// parsed.
    pub fn from_match_file<V, M, O>(
        video_path: V,
        match_file: M,
        output_dir: O,
    ) -> Result<Self, StillcutError>
    where
        V: Into<PathBuf>,
        M: AsRef<Path>,
        O: Into<PathBuf>,
    {
        let segments = load_match_data(match_file)?;
        Ok(Self::new(video_path, output_dir, segments))
    }

    /// Replace the run configuration.
    #[must_use]
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Segments as currently held (before the run, as loaded).
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Execute the run with the given extraction primitive.
    ///
    /// Per-keyframe failures, stalls and the global timeout never make this
    /// return `Err`; they show up in the report's counts and status.
    ///
    /// # Errors
    ///
    /// Returns a precondition error (see
    /// [`StillcutError::is_precondition`]) before anything is extracted, or
    /// an I/O error if the observer thread cannot be started.
    pub fn run(mut self, extractor: Arc<dyn FrameExtractor>) -> Result<ExtractionReport, StillcutError> {
        self.check_inputs()?;
        if let Some(sampling) = &self.options.sampling {
            resample_segments(&mut self.segments, sampling)?;
        }
        self.prepare_output_dir()?;

        let plan = plan(&self.output_dir, &mut self.segments);
        log::info!(
            "Prepared {} keyframe extraction(s) from {} segment(s)",
            plan.total_expected(),
            self.segments.len()
        );

        let observer = ProgressObserver::new(&self.output_dir, plan.total_expected())
            .with_range(self.options.progress_range)
            .with_poll_interval(self.options.poll_interval)
            .with_directory_grace(self.options.directory_grace)
            .with_stall_warning_after(self.options.stall_warning_after)
            .with_callback(Arc::clone(&self.options.progress))
            .spawn()?;

        let cancellation = self.options.cancellation.clone().unwrap_or_default();
        let dispatch_job = DispatchJob::new(self.video_path.clone(), &plan, extractor)
            .with_cancellation(cancellation)
            .with_timeout(self.options.timeout);
        let dispatched = self.options.dispatcher().dispatch(dispatch_job);

        // Stop the observer before surfacing a dispatch error.
        let observation = observer.finish();
        let dispatch = dispatched?;
        log::debug!(
            "Observer saw {} keyframe(s) over {} event(s)",
            observation.completed,
            observation.events_emitted
        );

        let summary = reconcile(&plan, &mut self.segments);

        Ok(ExtractionReport {
            status: summary.status,
            total_expected: summary.total_expected,
            successful_extractions: summary.succeeded,
            failed_extractions: summary.failed,
            dispatch,
            segments: self.segments,
        })
    }

    fn check_inputs(&self) -> Result<(), StillcutError> {
        self.options.validate()?;

        let is_file = fs::metadata(&self.video_path).is_ok_and(|metadata| metadata.is_file());
        if !is_file {
            return Err(StillcutError::VideoNotFound {
                path: self.video_path.clone(),
            });
        }

        // Sampling derives its own times, so only listed times are required.
        let unlisted = self
            .segments
            .iter()
            .find(|segment| !segment.has_extraction_times());
        if let (None, Some(segment)) = (&self.options.sampling, unlisted) {
            return Err(StillcutError::MissingExtractionTimes {
                index: segment.index(),
            });
        }

        Ok(())
    }

    fn prepare_output_dir(&self) -> Result<(), StillcutError> {
        let output_error = |error: std::io::Error| StillcutError::OutputDirectory {
            path: self.output_dir.clone(),
            reason: error.to_string(),
        };
        fs::create_dir_all(&self.output_dir).map_err(output_error)?;

        let probe = self.output_dir.join(WRITE_PROBE_NAME);
        fs::write(&probe, b"").map_err(output_error)?;
        fs::remove_file(&probe).map_err(output_error)?;

        Ok(())
    }
}
