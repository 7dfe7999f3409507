//! Re-deriving extraction times from subtitle spans.
//!
//! By default a run extracts exactly the timestamps the match file lists.
//! When [`SamplingOptions`] are configured, each segment's timestamps are
//! recomputed from its subtitle span instead: either the single middle
//! point, or points at a fixed interval, optionally thinned to a maximum
//! count by uniform down-sampling.

use std::time::Duration;

use crate::{error::StillcutError, segment::Segment, timestamp::Timestamp};

/// Spans shorter than this get their middle point instead of a start-aligned one.
const MINIMUM_TAIL_SECONDS: f64 = 0.1;

/// Upper bound on interval points per segment, before down-sampling.
const MAX_SAMPLED_POINTS: usize = 100_000;

/// Fallback segment length when the match data carries neither span nor duration.
const DEFAULT_SEGMENT_SECONDS: f64 = 1.0;

/// How to re-sample extraction times from segment spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamplingOptions {
    /// Distance between extraction points. `None` extracts only the middle
    /// point of each span.
    pub interval: Option<Duration>,
    /// Upper bound on points per segment. `None` means unbounded.
    pub max_frames: Option<usize>,
}

impl SamplingOptions {
    /// Middle-point sampling with no frame cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample every `interval` across the span.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Cap the number of points per segment.
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Reject a zero interval or a zero frame cap.
    ///
    /// # Errors
    ///
    /// Returns [`StillcutError::InvalidConfiguration`].
    pub fn validate(&self) -> Result<(), StillcutError> {
        if self.interval.is_some_and(|interval| interval.is_zero()) {
            return Err(StillcutError::InvalidConfiguration(
                "sampling interval must be greater than zero".to_string(),
            ));
        }
        if self.max_frames == Some(0) {
            return Err(StillcutError::InvalidConfiguration(
                "max frames must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Compute extraction points between `start` and `end` (seconds).
///
/// # Errors
///
/// Returns [`StillcutError::InvalidConfiguration`] for a zero interval, or
/// when the interval would produce more than 100 000 points for the span.
pub fn sample_times(
    start: f64,
    end: f64,
    options: &SamplingOptions,
) -> Result<Vec<Timestamp>, StillcutError> {
    let middle = start + (end - start) / 2.0;

    let Some(interval) = options.interval else {
        return Ok(vec![Timestamp::from_secs_f64(middle)]);
    };
    if interval.is_zero() {
        return Err(StillcutError::InvalidConfiguration(
            "sampling interval must be greater than zero".to_string(),
        ));
    }

    let step = interval.as_secs_f64();
    let mut points: Vec<f64> = (0..=MAX_SAMPLED_POINTS)
        .map(|k| start + k as f64 * step)
        .take_while(|&point| point <= end)
        .collect();

    if points.len() > MAX_SAMPLED_POINTS {
        return Err(StillcutError::InvalidConfiguration(format!(
            "sampling every {interval:?} between {start:.3}s and {end:.3}s yields more than {MAX_SAMPLED_POINTS} points"
        )));
    }

    if points.is_empty() || (points.len() == 1 && points[0] > end - MINIMUM_TAIL_SECONDS) {
        points = vec![middle];
    }

    if let Some(max_frames) = options.max_frames {
        if max_frames > 0 && points.len() > max_frames {
            points = downsample(&points, max_frames);
        }
    }

    Ok(points.into_iter().map(Timestamp::from_secs_f64).collect())
}

fn downsample(points: &[f64], max_frames: usize) -> Vec<f64> {
    let last = points.len() - 1;
    if max_frames == 1 {
        return vec![points[last / 2]];
    }
    (0..max_frames)
        .map(|k| points[k * last / (max_frames - 1)])
        .collect()
}

/// Parse a subtitle span of the form `start --> end`.
///
/// # Errors
///
/// Returns [`StillcutError::InvalidTimestamp`] if the arrow is missing or
/// either side does not parse.
pub fn parse_span(span: &str) -> Result<(Timestamp, Timestamp), StillcutError> {
    let (start, end) = span
        .split_once("-->")
        .ok_or_else(|| StillcutError::InvalidTimestamp {
            value: span.to_string(),
            reason: "expected 'start --> end'".to_string(),
        })?;
    Ok((Timestamp::parse(start)?, Timestamp::parse(end)?))
}

/// Replace every segment's extraction times according to `options`.
///
/// # Errors
///
/// Returns an error if a segment's span is malformed or yields too many
/// points.
pub(crate) fn resample_segments(
    segments: &mut [Segment],
    options: &SamplingOptions,
) -> Result<(), StillcutError> {
    for segment in segments.iter_mut() {
        let (start, end) = segment_bounds(segment)?;
        let times = sample_times(start, end, options)?;
        log::debug!(
            "Segment {}: sampled {} point(s) between {:.3}s and {:.3}s",
            segment.index(),
            times.len(),
            start,
            end
        );
        segment.set_extraction_times(times);
    }
    Ok(())
}

fn segment_bounds(segment: &Segment) -> Result<(f64, f64), StillcutError> {
    if let Some(span) = segment.span() {
        let (start, end) = parse_span(span)?;
        return Ok((start.as_secs_f64(), end.as_secs_f64()));
    }

    // No span: assume back-to-back segments of equal length.
    let duration = segment.duration().unwrap_or(DEFAULT_SEGMENT_SECONDS);
    let start = segment.index().saturating_sub(1) as f64 * duration;
    Ok((start, start + duration))
}
