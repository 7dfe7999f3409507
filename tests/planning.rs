//! Path planning tests.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use stillcut::{Segment, Timestamp, is_keyframe_filename, keyframe_filename, plan, staging_path};

fn times(values: &[&str]) -> Vec<Timestamp> {
    values.iter().map(|value| Timestamp::parse(value).unwrap()).collect()
}

fn two_segments() -> Vec<Segment> {
    vec![
        Segment::new(1, times(&["00:00:05.000", "00:00:10.000"])),
        Segment::new(2, times(&["00:00:15.250"])),
    ]
}

#[test]
fn filename_format_is_exact() {
    let timestamp = Timestamp::parse("00:01:30.500").unwrap();
    assert_eq!(keyframe_filename(1, timestamp), "segment_1_keyframe_000130500.jpg");
    assert_eq!(keyframe_filename(12, timestamp), "segment_12_keyframe_000130500.jpg");
}

#[test]
fn filenames_are_injective() {
    let stamps = times(&["00:00:00.000", "00:00:00.001", "00:00:01.000", "01:00:00.000"]);
    let mut names = HashSet::new();
    for index in 1..=12 {
        for &timestamp in &stamps {
            assert!(names.insert(keyframe_filename(index, timestamp)));
        }
    }
    assert_eq!(names.len(), 12 * stamps.len());
}

#[test]
fn plan_assigns_paths_in_timestamp_order() {
    let output_dir = Path::new("/keyframes");
    let mut segments = two_segments();
    let plan = plan(output_dir, &mut segments);

    assert_eq!(plan.total_expected(), 3);
    assert_eq!(
        segments[0].keyframe_paths(),
        &[
            PathBuf::from("/keyframes/segment_1_keyframe_000005000.jpg"),
            PathBuf::from("/keyframes/segment_1_keyframe_000010000.jpg"),
        ]
    );
    assert_eq!(
        segments[1].keyframe_paths(),
        &[PathBuf::from("/keyframes/segment_2_keyframe_000015250.jpg")]
    );

    let tasks = plan.tasks();
    assert_eq!(tasks[0].segment_index, 1);
    assert_eq!(tasks[2].segment_index, 2);
    assert_eq!(tasks[2].timestamp, Timestamp::parse("00:00:15.250").unwrap());
}

#[test]
fn plan_is_deterministic() {
    let mut first = two_segments();
    let mut second = two_segments();
    let first_plan = plan(Path::new("out"), &mut first);
    let second_plan = plan(Path::new("out"), &mut second);

    assert_eq!(first_plan, second_plan);
    assert_eq!(first, second);
}

#[test]
fn replanning_replaces_paths() {
    let mut segments = two_segments();
    plan(Path::new("a"), &mut segments);
    plan(Path::new("b"), &mut segments);

    assert_eq!(segments[0].keyframe_paths().len(), 2);
    assert!(segments[0].keyframe_paths()[0].starts_with("b"));
}

#[test]
fn plan_touches_no_filesystem() {
    let directory = tempfile::tempdir().unwrap();
    let output_dir = directory.path().join("not-created");
    let mut segments = two_segments();
    let plan = plan(&output_dir, &mut segments);

    assert_eq!(plan.total_expected(), 3);
    assert!(!output_dir.exists());
}

#[test]
fn empty_plan() {
    let mut segments = vec![Segment::new(1, Vec::new())];
    let plan = plan(Path::new("out"), &mut segments);
    assert!(plan.is_empty());
    assert_eq!(plan.total_expected(), 0);
    assert!(segments[0].keyframe_paths().is_empty());
}

#[test]
fn keyframe_pattern() {
    assert!(is_keyframe_filename("segment_1_keyframe_000005000.jpg"));
    assert!(!is_keyframe_filename("segment_1_keyframe_000005000.jpg.part"));
    assert!(!is_keyframe_filename("segment_1_frame_000005000.jpg"));
    assert!(!is_keyframe_filename("keyframe_000005000.jpg"));
    assert!(!is_keyframe_filename("segment_1_keyframe_000005000.png"));
    assert!(!is_keyframe_filename("subtitle_keyframe_match.json"));
}

#[test]
fn staging_path_is_outside_pattern() {
    let destination = Path::new("/out/segment_1_keyframe_000005000.jpg");
    let staging = staging_path(destination);
    assert_eq!(staging, PathBuf::from("/out/segment_1_keyframe_000005000.jpg.part"));

    let name = staging.file_name().unwrap().to_str().unwrap();
    assert!(!is_keyframe_filename(name));
}
