//! Log level selection shared by the Rust logger and FFmpeg.
//!
//! FFmpeg has its own internal logging, separate from the Rust
//! [`log`](https://crates.io/crates/log) facade, and prints decoder
//! warnings straight to stderr. [`LogLevel`] is the single knob a run
//! exposes: it maps onto a [`log::LevelFilter`] for the crate's own
//! diagnostics and onto the matching FFmpeg level so both stay in step.
//!
//! # Example
//!
//! ```no_run
//! use stillcut::LogLevel;
//!
//! let level: LogLevel = "warn".parse().unwrap();
//! stillcut::set_ffmpeg_log_level(level);
//! assert_eq!(level.to_level_filter(), log::LevelFilter::Warn);
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use ffmpeg_next::util::log::Level;

use crate::error::StillcutError;

/// Verbosity of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogLevel {
    /// Per-keyframe diagnostics.
    Debug,
    /// Run summaries. The default.
    #[default]
    Info,
    /// Per-keyframe failures and stalls only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Filter for the `log` facade.
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }

    /// FFmpeg's equivalent level.
    ///
    /// FFmpeg's `Info` is chatty about every opened stream, so `Info` maps
    /// to FFmpeg warnings and only `Debug` lets its informational output
    /// through.
    pub(crate) fn to_ffmpeg_level(self) -> Level {
        match self {
            LogLevel::Debug => Level::Info,
            LogLevel::Info | LogLevel::Warn => Level::Warning,
            LogLevel::Error => Level::Error,
        }
    }
}

impl FromStr for LogLevel {
    type Err = StillcutError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(StillcutError::InvalidConfiguration(format!(
                "unsupported log level: {other}"
            ))),
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Set FFmpeg's global log level to match `level`.
///
/// This affects all FFmpeg operations in the current process.
pub fn set_ffmpeg_log_level(level: LogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}
