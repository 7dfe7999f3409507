//! Extraction-time sampling tests.

use std::time::Duration;

use stillcut::{SamplingOptions, StillcutError, Timestamp, parse_span, sample_times};

fn millis(times: &[Timestamp]) -> Vec<u64> {
    times.iter().map(|timestamp| timestamp.as_millis()).collect()
}

#[test]
fn middle_point_without_interval() {
    let times = sample_times(10.0, 14.0, &SamplingOptions::new()).unwrap();
    assert_eq!(millis(&times), vec![12_000]);
}

#[test]
fn interval_includes_end() {
    let options = SamplingOptions::new().with_interval(Duration::from_secs(1));
    let times = sample_times(0.0, 3.0, &options).unwrap();
    assert_eq!(millis(&times), vec![0, 1_000, 2_000, 3_000]);
}

#[test]
fn short_span_falls_back_to_middle() {
    let options = SamplingOptions::new().with_interval(Duration::from_secs(1));
    let times = sample_times(4.0, 4.05, &options).unwrap();
    assert_eq!(millis(&times), vec![4_025]);
}

#[test]
fn single_point_with_room_is_kept() {
    let options = SamplingOptions::new().with_interval(Duration::from_secs(1));
    let times = sample_times(4.0, 4.5, &options).unwrap();
    assert_eq!(millis(&times), vec![4_000]);
}

#[test]
fn max_frames_downsamples_uniformly() {
    let options = SamplingOptions::new()
        .with_interval(Duration::from_secs(1))
        .with_max_frames(4);
    let times = sample_times(0.0, 9.0, &options).unwrap();
    assert_eq!(millis(&times), vec![0, 3_000, 6_000, 9_000]);
}

#[test]
fn max_frames_one_picks_middle_point() {
    let options = SamplingOptions::new()
        .with_interval(Duration::from_secs(1))
        .with_max_frames(1);
    let times = sample_times(0.0, 9.0, &options).unwrap();
    assert_eq!(millis(&times), vec![4_000]);
}

#[test]
fn max_frames_above_count_keeps_all() {
    let options = SamplingOptions::new()
        .with_interval(Duration::from_secs(2))
        .with_max_frames(10);
    let times = sample_times(0.0, 4.0, &options).unwrap();
    assert_eq!(millis(&times), vec![0, 2_000, 4_000]);
}

#[test]
fn dense_interval_over_long_span_is_rejected() {
    let options = SamplingOptions::new().with_interval(Duration::from_millis(1));
    let result = sample_times(0.0, 36_000.0, &options);
    assert!(matches!(result, Err(StillcutError::InvalidConfiguration(_))));

    let capped = options.with_max_frames(3);
    assert!(sample_times(0.0, 36_000.0, &capped).is_err());
}

#[test]
fn zero_interval_is_rejected() {
    let options = SamplingOptions {
        interval: Some(Duration::ZERO),
        max_frames: None,
    };
    assert!(sample_times(0.0, 4.0, &options).is_err());
}

#[test]
fn validate_rejects_zero_values() {
    let zero_interval = SamplingOptions::new().with_interval(Duration::ZERO);
    assert!(matches!(
        zero_interval.validate(),
        Err(StillcutError::InvalidConfiguration(_))
    ));

    let zero_frames = SamplingOptions::new().with_max_frames(0);
    assert!(zero_frames.validate().is_err());

    assert!(SamplingOptions::new().validate().is_ok());
}

#[test]
fn span_parsing() {
    let (start, end) = parse_span("00:00:01,000 --> 00:00:04,500").unwrap();
    assert_eq!(start.as_millis(), 1_000);
    assert_eq!(end.as_millis(), 4_500);

    assert!(matches!(
        parse_span("00:00:01,000 00:00:04,500"),
        Err(StillcutError::InvalidTimestamp { .. })
    ));
    assert!(parse_span("00:00:01,000 --> later").is_err());
}
