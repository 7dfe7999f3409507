//! Deterministic output-path planning.
//!
//! [`plan`] runs once, before any extraction, and fixes the destination of
//! every keyframe. The resulting [`PlanIndex`] is the single source of truth
//! for what should exist on disk: the progress observer reads its size and
//! the reconciler checks each of its paths.
//!
//! Filenames follow `segment_{index}_keyframe_{HHMMSSmmm}.jpg`. The segment
//! index and the exact timestamp together form the key, so two timestamps in
//! one segment that render to the same digits are a caller data error.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{segment::Segment, timestamp::Timestamp};

const SEGMENT_MARKER: &str = "segment_";
const KEYFRAME_MARKER: &str = "keyframe_";
const KEYFRAME_EXTENSION: &str = ".jpg";
const STAGING_SUFFIX: &str = ".part";

/// One unit of extraction work: where to write the frame at `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtractionTask {
    /// 1-based index of the owning segment.
    pub segment_index: usize,
    /// Position in the video to extract.
    pub timestamp: Timestamp,
    /// Absolute or output-dir-relative destination path.
    pub destination: PathBuf,
}

/// The full set of planned extractions, in plan order.
///
/// Built once by [`plan`] and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanIndex {
    tasks: Vec<ExtractionTask>,
}

impl PlanIndex {
    /// Number of keyframes the run is expected to produce.
    pub fn total_expected(&self) -> usize {
        self.tasks.len()
    }

    /// `true` when nothing is planned.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Planned tasks in plan order (segment order, then timestamp order).
    pub fn tasks(&self) -> &[ExtractionTask] {
        &self.tasks
    }

    /// Iterate over planned destinations.
    pub fn destinations(&self) -> impl Iterator<Item = &Path> {
        self.tasks.iter().map(|task| task.destination.as_path())
    }
}

/// Canonical keyframe filename for a segment and timestamp.
///
/// ```
/// use stillcut::{Timestamp, keyframe_filename};
///
/// let timestamp = Timestamp::parse("00:00:15.250").unwrap();
/// assert_eq!(keyframe_filename(2, timestamp), "segment_2_keyframe_000015250.jpg");
/// ```
pub fn keyframe_filename(segment_index: usize, timestamp: Timestamp) -> String {
    format!(
        "{SEGMENT_MARKER}{segment_index}_{KEYFRAME_MARKER}{}{KEYFRAME_EXTENSION}",
        timestamp.digits()
    )
}

/// Whether a directory entry name counts as a produced keyframe.
pub fn is_keyframe_filename(name: &str) -> bool {
    name.ends_with(KEYFRAME_EXTENSION)
        && name.contains(SEGMENT_MARKER)
        && name.contains(KEYFRAME_MARKER)
}

/// Staging path an extractor writes to before renaming onto `destination`.
///
/// The suffix keeps half-written files out of the keyframe pattern.
pub fn staging_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

/// Compute every destination path and record it on its segment.
///
/// Each segment's `keyframe_paths` is replaced with one path per extraction
/// time, in timestamp order. No filesystem access happens here.
pub fn plan(output_dir: &Path, segments: &mut [Segment]) -> PlanIndex {
    let mut tasks = Vec::new();

    for segment in segments.iter_mut() {
        let index = segment.index();
        let segment_tasks: Vec<ExtractionTask> = segment
            .extraction_times()
            .iter()
            .map(|&timestamp| ExtractionTask {
                segment_index: index,
                timestamp,
                destination: output_dir.join(keyframe_filename(index, timestamp)),
            })
            .collect();

        segment.assign_keyframe_paths(
            segment_tasks
                .iter()
                .map(|task| task.destination.clone())
                .collect(),
        );
        tasks.extend(segment_tasks);
    }

    log::debug!(
        "Planned {} keyframe(s) across {} segment(s) in {}",
        tasks.len(),
        segments.len(),
        output_dir.display()
    );

    PlanIndex { tasks }
}
