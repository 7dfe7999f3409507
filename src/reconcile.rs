//! Post-run reconciliation against the filesystem.
//!
//! After dispatch has finished (or been abandoned at the timeout),
//! [`reconcile`] checks every planned destination, prunes each segment's
//! path list down to the files that really exist, and classifies the run.
//! Nothing the dispatcher reported is consulted: the filesystem is the only
//! source of truth.

use std::{
    collections::HashSet,
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    io::ErrorKind,
    path::Path,
};

use serde::Serialize;

use crate::{
    plan::{PlanIndex, staging_path},
    segment::Segment,
};

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// Every planned keyframe exists (or nothing was planned).
    Success,
    /// Some planned keyframes exist.
    PartialSuccess,
    /// No planned keyframe exists.
    Failure,
}

impl ExtractionStatus {
    /// Classify a run from its counts.
    pub fn from_counts(total_expected: usize, succeeded: usize) -> Self {
        if succeeded >= total_expected {
            ExtractionStatus::Success
        } else if succeeded == 0 {
            ExtractionStatus::Failure
        } else {
            ExtractionStatus::PartialSuccess
        }
    }

    /// Process exit code: `0` success, `1` failure, `2` partial success.
    pub fn exit_code(self) -> i32 {
        match self {
            ExtractionStatus::Success => 0,
            ExtractionStatus::Failure => 1,
            ExtractionStatus::PartialSuccess => 2,
        }
    }
}

impl Display for ExtractionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            ExtractionStatus::Success => "success",
            ExtractionStatus::PartialSuccess => "partial success",
            ExtractionStatus::Failure => "failure",
        };
        f.write_str(label)
    }
}

/// Counts and status produced by [`reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Size of the plan.
    pub total_expected: usize,
    /// Planned keyframes found on disk.
    pub succeeded: usize,
    /// Planned keyframes missing from disk.
    pub failed: usize,
    /// Classification of the run.
    pub status: ExtractionStatus,
}

/// Verify the plan against the filesystem and prune `segments`.
///
/// A destination counts as produced only if it is a non-empty regular file.
/// Empty files are treated as interrupted writes and removed, as are
/// leftover staging files next to failed destinations. Running this twice on
/// an unchanged filesystem yields the same summary and path lists.
pub fn reconcile(plan: &PlanIndex, segments: &mut [Segment]) -> ReconcileSummary {
    let produced: HashSet<&Path> = plan
        .destinations()
        .filter(|destination| {
            let exists = verify_destination(destination);
            if !exists {
                remove_stray(&staging_path(destination));
            }
            exists
        })
        .collect();

    for segment in segments.iter_mut() {
        segment.retain_keyframe_paths(|path| produced.contains(path.as_path()));
        log::debug!(
            "Segment {}: {} keyframe(s) kept",
            segment.index(),
            segment.keyframe_paths().len()
        );
    }

    let total_expected = plan.total_expected();
    let succeeded = plan
        .destinations()
        .filter(|destination| produced.contains(destination))
        .count();
    let failed = total_expected - succeeded;
    let status = ExtractionStatus::from_counts(total_expected, succeeded);

    log::info!("Keyframe extraction finished: {succeeded}/{total_expected} succeeded, {failed} failed ({status})");

    ReconcileSummary {
        total_expected,
        succeeded,
        failed,
        status,
    }
}

fn verify_destination(destination: &Path) -> bool {
    match fs::metadata(destination) {
        Ok(metadata) if metadata.is_file() && metadata.len() > 0 => true,
        Ok(metadata) if metadata.is_file() => {
            log::warn!("Removing empty keyframe {}", destination.display());
            remove_stray(destination);
            false
        }
        Ok(_) => false,
        Err(error) => {
            if error.kind() != ErrorKind::NotFound {
                log::warn!("Cannot inspect {}: {error}", destination.display());
            }
            false
        }
    }
}

fn remove_stray(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("Removed leftover {}", path.display()),
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => log::warn!("Failed to remove leftover {}: {error}", path.display()),
    }
}
