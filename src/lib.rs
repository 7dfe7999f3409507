//! # stillcut
//!
//! Extract subtitle-aligned keyframes from a video across a pool of
//! workers, and decide what succeeded by looking at the filesystem.
//!
//! An upstream matching step produces, for every subtitle segment, a list
//! of timestamps worth a still image. `stillcut` turns that list into JPEG
//! files named `segment_{index}_keyframe_{HHMMSSmmm}.jpg`:
//!
//! - **Planning** fixes every output path up front, deterministically.
//! - **Dispatch** runs one extraction per path on a rayon pool, or one at a
//!   time in sequential mode. A failed keyframe never stops the others.
//! - **Observation** counts matching files in the output directory on a
//!   separate thread and reports progress only when the count grows.
//! - **Reconciliation** checks every planned path afterwards, prunes the
//!   segments' path lists to what exists, and classifies the run as
//!   success, partial success, or failure.
//!
//! No component keeps a progress or result ledger; the output directory is
//! the single source of truth.
//!
//! ## Quick Start
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
//! std::process::exit(report.exit_code());
//! # Ok::<(), stillcut::StillcutError>(())
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system for the
//! default [`FfmpegExtractor`]. Any other [`FrameExtractor`] can be plugged
//! in instead.

pub mod configuration;
pub mod dispatch;
pub mod error;
pub mod extractor;
pub mod ffmpeg;
pub mod job;
pub mod plan;
pub mod progress;
pub mod reconcile;
pub mod sampling;
pub mod segment;
pub mod timestamp;

pub use configuration::ExtractOptions;
pub use dispatch::{
    DispatchJob, DispatchOutcome, Dispatcher, PooledDispatcher, SequentialDispatcher,
};
pub use error::StillcutError;
pub use extractor::{FfmpegExtractor, FrameExtractor};
pub use ffmpeg::{LogLevel, set_ffmpeg_log_level};
pub use job::{ExtractionReport, KeyframeJob};
pub use plan::{
    ExtractionTask, PlanIndex, is_keyframe_filename, keyframe_filename, plan, staging_path,
};
pub use progress::{
    CancellationToken, ObservationSummary, ObserverHandle, ProgressCallback, ProgressEvent,
    ProgressObserver, ProgressRange, ProgressTracker, count_keyframes,
};
pub use reconcile::{ExtractionStatus, ReconcileSummary, reconcile};
pub use sampling::{SamplingOptions, parse_span, sample_times};
pub use segment::{Segment, load_match_data, parse_match_data, save_match_data};
pub use timestamp::Timestamp;
