//! ExtractOptions and LogLevel tests.

use std::{sync::Arc, time::Duration};

use stillcut::{
    CancellationToken, ExtractOptions, LogLevel, ProgressCallback, ProgressEvent, ProgressRange,
    SamplingOptions, StillcutError,
};

struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

// ── ExtractOptions builder ─────────────────────────────────────────

#[test]
fn config_defaults() {
    let config = ExtractOptions::new();
    assert_eq!(config.max_workers(), 4);
    assert!(!config.is_sequential());
    assert!(config.validate().is_ok());

    let debug = format!("{config:?}");
    assert!(debug.contains("ExtractOptions"));
    assert!(debug.contains("has_cancellation: false"));
    assert!(debug.contains("timeout: 3000s"));
}

#[test]
fn config_builder_chain() {
    let config = ExtractOptions::new()
        .with_max_workers(8)
        .with_sequential(true)
        .with_timeout(Duration::from_secs(60))
        .with_poll_interval(Duration::from_millis(500))
        .with_progress_range(ProgressRange::new(17.0, 20.0))
        .with_progress(Arc::new(SilentProgress))
        .with_cancellation(CancellationToken::new());

    assert_eq!(config.max_workers(), 8);
    assert!(config.is_sequential());
    assert!(config.validate().is_ok());
    assert!(format!("{config:?}").contains("has_cancellation: true"));
}

#[test]
fn config_rejects_zero_workers() {
    let result = ExtractOptions::new().with_max_workers(0).validate();
    assert!(matches!(result, Err(StillcutError::InvalidConfiguration(_))));
}

#[test]
fn config_rejects_zero_poll_interval() {
    let result = ExtractOptions::new()
        .with_poll_interval(Duration::ZERO)
        .validate();
    assert!(result.is_err());
}

#[test]
fn config_rejects_inverted_range() {
    let result = ExtractOptions::new()
        .with_progress_range(ProgressRange::new(20.0, 17.0))
        .validate();
    assert!(result.is_err());

    let result = ExtractOptions::new()
        .with_progress_range(ProgressRange::new(0.0, f32::NAN))
        .validate();
    assert!(result.is_err());
}

#[test]
fn config_rejects_bad_sampling() {
    let result = ExtractOptions::new()
        .with_sampling(SamplingOptions::new().with_max_frames(0))
        .validate();
    assert!(result.is_err());
}

// ── LogLevel ───────────────────────────────────────────────────────

#[test]
fn log_level_parses_case_insensitively() {
    assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
    assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
    assert_eq!("Warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
    assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
    assert!("verbose".parse::<LogLevel>().is_err());
}

#[test]
fn log_level_maps_to_filter() {
    assert_eq!(LogLevel::default(), LogLevel::Info);
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::Debug.to_string(), "DEBUG");
}
