//! Subtitle-aligned segments and match-data I/O.
//!
//! A [`Segment`] is one subtitle-aligned unit of the source video together
//! with the timestamps at which keyframes should be extracted from it. The
//! upstream matching step hands segments over as a JSON array (the "match
//! file"); after extraction the same structure is written back with each
//! segment's `keyframe_paths` pruned to the files that actually exist.
//!
//! A segment's path list has exactly two mutation points: the planner
//! assigns one path per timestamp, then the reconciler drops the paths
//! whose files were not produced.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::StillcutError, timestamp::Timestamp};

/// One subtitle-aligned unit of video.
///
/// Fields the crate does not interpret (subtitle text, scene descriptions,
/// upstream bookkeeping) are kept verbatim in [`extra`](Segment::extra) and
/// round-trip through [`save_match_data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(skip)]
    index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extraction_times: Option<Vec<Timestamp>>,
    #[serde(default)]
    keyframe_paths: Vec<PathBuf>,
    /// Subtitle span as `start --> end`, used when re-sampling.
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    span: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Segment {
    /// Create a segment with a 1-based `index` and its extraction times.
    pub fn new(index: usize, extraction_times: Vec<Timestamp>) -> Self {
        Self {
            index,
            extraction_times: Some(extraction_times),
            keyframe_paths: Vec::new(),
            span: None,
            duration: None,
            extra: Map::new(),
        }
    }

    /// Attach the subtitle span (`"00:00:01,000 --> 00:00:04,000"`).
    #[must_use]
    pub fn with_span(mut self, span: impl Into<String>) -> Self {
        self.span = Some(span.into());
        self
    }

    /// Attach the segment duration in seconds.
    #[must_use]
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Stable 1-based index of this segment.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Extraction timestamps in order. Empty if the match data listed none.
    pub fn extraction_times(&self) -> &[Timestamp] {
        self.extraction_times.as_deref().unwrap_or_default()
    }

    /// Whether the match data carried an `extraction_times` field at all.
    ///
    /// An explicit empty list counts; a missing field does not.
    pub fn has_extraction_times(&self) -> bool {
        self.extraction_times.is_some()
    }

    /// Planned paths before reconciliation, existing paths after.
    pub fn keyframe_paths(&self) -> &[PathBuf] {
        &self.keyframe_paths
    }

    /// The subtitle span, if the upstream data carried one.
    pub fn span(&self) -> Option<&str> {
        self.span.as_deref()
    }

    /// The segment duration in seconds, if the upstream data carried one.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Upstream fields that are passed through untouched.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    pub(crate) fn set_extraction_times(&mut self, times: Vec<Timestamp>) {
        self.extraction_times = Some(times);
    }

    pub(crate) fn assign_keyframe_paths(&mut self, paths: Vec<PathBuf>) {
        self.keyframe_paths = paths;
    }

    pub(crate) fn retain_keyframe_paths<F>(&mut self, keep: F)
    where
        F: FnMut(&PathBuf) -> bool,
    {
        self.keyframe_paths.retain(keep);
    }
}

/// Parse match data from a JSON string.
///
/// Indexes are assigned from array position, starting at 1.
///
/// # Errors
///
/// Returns [`StillcutError::MatchData`] if the text is not a JSON array of
/// objects or any extraction time fails to parse. `origin` is only used in
/// the error.
pub fn parse_match_data(text: &str, origin: &Path) -> Result<Vec<Segment>, StillcutError> {
    let mut segments: Vec<Segment> =
        serde_json::from_str(text).map_err(|error| StillcutError::MatchData {
            path: origin.to_path_buf(),
            reason: error.to_string(),
        })?;

    for (position, segment) in segments.iter_mut().enumerate() {
        segment.index = position + 1;
    }

    Ok(segments)
}

/// Read and parse a match file.
///
/// # Errors
///
/// Returns [`StillcutError::MatchData`] if the file cannot be read or
/// parsed.
pub fn load_match_data<P: AsRef<Path>>(path: P) -> Result<Vec<Segment>, StillcutError> {
    let path = path.as_ref();
    log::debug!("Loading match data from {}", path.display());

    let text = fs::read_to_string(path).map_err(|error| StillcutError::MatchData {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;
    let segments = parse_match_data(&text, path)?;

    log::info!("Loaded {} segment(s) from {}", segments.len(), path.display());
    Ok(segments)
}

/// Write segments back as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`StillcutError::IoError`] or [`StillcutError::JsonError`].
pub fn save_match_data<P: AsRef<Path>>(path: P, segments: &[Segment]) -> Result<(), StillcutError> {
    let json = serde_json::to_string_pretty(segments)?;
    fs::write(path, json)?;
    Ok(())
}
