//! Millisecond-precision video timestamps.
//!
//! Upstream match data lists extraction times as `HH:MM:SS.mmm` strings.
//! [`Timestamp`] parses them once at load time so the rest of the crate
//! works with an integer millisecond offset, and renders the fixed-width
//! digit string used in keyframe filenames.
//!
//! # Example
//!
//! ```
//! use stillcut::Timestamp;
//!
//! let timestamp = Timestamp::parse("00:01:30.500")?;
//! assert_eq!(timestamp.digits(), "000130500");
//! assert_eq!(timestamp.to_string(), "00:01:30.500");
//! # Ok::<(), stillcut::StillcutError>(())
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::StillcutError;

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;

/// An offset from the start of a video, in whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp {
    millis: u64,
}

impl Timestamp {
    /// The start of the video.
    pub const ZERO: Timestamp = Timestamp { millis: 0 };

    /// Create a timestamp from a millisecond offset.
    pub const fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    /// Create a timestamp from fractional seconds, rounded to the nearest
    /// millisecond. Negative and non-finite inputs clamp to zero.
    pub fn from_secs_f64(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Self::ZERO;
        }
        Self::from_millis((seconds * MILLIS_PER_SECOND as f64).round() as u64)
    }

    /// Parse an `HH:MM:SS.mmm` string.
    ///
    /// A comma is accepted in place of the dot (SRT style), the fraction may
    /// have one to three digits (`.5` is 500 ms) or be omitted entirely.
    ///
    /// # Errors
    ///
    /// Returns [`StillcutError::InvalidTimestamp`] when the string does not
    /// have three colon-separated fields, a field is not numeric, or the
    /// minutes/seconds are 60 or more, or the total overflows.
    pub fn parse(value: &str) -> Result<Self, StillcutError> {
        let invalid = |reason: &str| StillcutError::InvalidTimestamp {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let mut fields = value.trim().split(':');
        let (Some(hours), Some(minutes), Some(rest), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(invalid("expected HH:MM:SS.mmm"));
        };

        let (seconds, fraction) = rest
            .split_once(|c| c == '.' || c == ',')
            .unwrap_or((rest, ""));

        let hours = parse_field(hours).ok_or_else(|| invalid("hours are not numeric"))?;
        let minutes = parse_field(minutes).ok_or_else(|| invalid("minutes are not numeric"))?;
        let seconds = parse_field(seconds).ok_or_else(|| invalid("seconds are not numeric"))?;
        if minutes >= 60 {
            return Err(invalid("minutes must be below 60"));
        }
        if seconds >= 60 {
            return Err(invalid("seconds must be below 60"));
        }

        let millis = if fraction.is_empty() {
            0
        } else {
            if fraction.len() > 3 {
                return Err(invalid("at most three fraction digits are allowed"));
            }
            let digits =
                parse_field(fraction).ok_or_else(|| invalid("fraction is not numeric"))?;
            digits * 10_u64.pow(3 - fraction.len() as u32)
        };

        hours
            .checked_mul(MILLIS_PER_HOUR)
            .and_then(|total| total.checked_add(minutes * MILLIS_PER_MINUTE))
            .and_then(|total| total.checked_add(seconds * MILLIS_PER_SECOND + millis))
            .map(Self::from_millis)
            .ok_or_else(|| invalid("timestamp is out of range"))
    }

    /// Total milliseconds since video start.
    pub const fn as_millis(&self) -> u64 {
        self.millis
    }

    /// The offset as a [`Duration`].
    pub const fn as_duration(&self) -> Duration {
        Duration::from_millis(self.millis)
    }

    /// The offset in fractional seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.millis as f64 / MILLIS_PER_SECOND as f64
    }

    /// Hours, minutes, seconds and milliseconds concatenated with no
    /// separators, each zero-padded (`00:01:30.500` becomes `000130500`).
    ///
    /// Nine digits unless the hour field needs more than two.
    pub fn digits(&self) -> String {
        let (hours, minutes, seconds, millis) = self.fields();
        format!("{hours:02}{minutes:02}{seconds:02}{millis:03}")
    }

    fn fields(&self) -> (u64, u64, u64, u64) {
        (
            self.millis / MILLIS_PER_HOUR,
            self.millis % MILLIS_PER_HOUR / MILLIS_PER_MINUTE,
            self.millis % MILLIS_PER_MINUTE / MILLIS_PER_SECOND,
            self.millis % MILLIS_PER_SECOND,
        )
    }
}

fn parse_field(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let (hours, minutes, seconds, millis) = self.fields();
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
    }
}

impl FromStr for Timestamp {
    type Err = StillcutError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = StillcutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.to_string()
    }
}
