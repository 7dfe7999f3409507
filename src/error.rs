//! Error types for the `stillcut` crate.
//!
//! This module defines [`StillcutError`], the unified error type returned by
//! every fallible operation in the crate. Variants carry the offending path,
//! value, or upstream message so callers can report them without extra
//! logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use serde_json::Error as JsonError;
use thiserror::Error;

use crate::timestamp::Timestamp;

/// The unified error type for all `stillcut` operations.
///
/// Errors fall into two groups. Precondition errors (see
/// [`is_precondition`](StillcutError::is_precondition)) are raised before any
/// extraction is dispatched and abort the run. Everything else is raised by a
/// single extraction and is absorbed by the dispatcher.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StillcutError {
    /// The source video does not exist or is not a regular file.
    #[error("Video file not found: {path}")]
    VideoNotFound {
        /// Path that was passed in.
        path: PathBuf,
    },

    /// The match data could not be read or has the wrong shape.
    #[error("Malformed match data at {path}: {reason}")]
    MatchData {
        /// Path of the match file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// A segment has no `extraction_times` and sampling is not enabled.
    #[error("Segment {index} lists no extraction_times and sampling is disabled")]
    MissingExtractionTimes {
        /// 1-based index of the segment.
        index: usize,
    },

    /// A timestamp string is not in `HH:MM:SS.mmm` form.
    #[error("Invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Which part failed to parse.
        reason: String,
    },

    /// The output directory could not be created or written to.
    #[error("Output directory {path} is not usable: {reason}")]
    OutputDirectory {
        /// The output directory.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// An option value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The worker pool could not be started.
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),

    /// The media file could not be opened by FFmpeg.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path of the video.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// No frame exists at or after the requested timestamp.
    #[error("Timestamp {0} is beyond the end of the video stream")]
    TimestampBeyondEnd(Timestamp),

    /// An extraction primitive panicked instead of returning an error.
    #[error("Extraction panicked: {0}")]
    ExtractorPanicked(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while encoding a keyframe.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] JsonError),
}

impl StillcutError {
    /// Returns `true` for errors detected before dispatch.
    ///
    /// These abort the run with no extraction attempted.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            StillcutError::VideoNotFound { .. }
                | StillcutError::MatchData { .. }
                | StillcutError::MissingExtractionTimes { .. }
                | StillcutError::InvalidTimestamp { .. }
                | StillcutError::OutputDirectory { .. }
                | StillcutError::InvalidConfiguration(_)
                | StillcutError::WorkerPool(_)
        )
    }
}

impl From<FfmpegError> for StillcutError {
    fn from(error: FfmpegError) -> Self {
        StillcutError::FfmpegError(error.to_string())
    }
}
