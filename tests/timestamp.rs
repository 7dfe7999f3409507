//! Timestamp parsing and filename-digit rendering tests.

use std::time::Duration;

use stillcut::{StillcutError, Timestamp};

#[test]
fn digits_drop_separators() {
    let timestamp = Timestamp::parse("00:01:30.500").unwrap();
    assert_eq!(timestamp.digits(), "000130500");

    let timestamp = Timestamp::parse("01:00:00.000").unwrap();
    assert_eq!(timestamp.digits(), "010000000");
}

#[test]
fn digits_match_source_without_separators() {
    for source in ["00:00:05.000", "00:00:15.250", "12:34:56.789", "00:59:59.999"] {
        let timestamp = Timestamp::parse(source).unwrap();
        assert_eq!(timestamp.digits(), source.replace([':', '.'], ""));
        assert_eq!(timestamp.to_string(), source);
    }
}

#[test]
fn parse_value() {
    let timestamp = Timestamp::parse("01:02:03.456").unwrap();
    assert_eq!(timestamp.as_millis(), 3_723_456);
    assert_eq!(timestamp.as_duration(), Duration::from_millis(3_723_456));
}

#[test]
fn parse_accepts_comma_and_short_fraction() {
    assert_eq!(
        Timestamp::parse("00:01:30,500").unwrap(),
        Timestamp::parse("00:01:30.500").unwrap()
    );
    assert_eq!(Timestamp::parse("00:00:01.5").unwrap().as_millis(), 1_500);
    assert_eq!(Timestamp::parse("00:00:01.05").unwrap().as_millis(), 1_050);
    assert_eq!(Timestamp::parse("00:00:07").unwrap().as_millis(), 7_000);
    assert_eq!(Timestamp::parse(" 00:00:07.000 ").unwrap().as_millis(), 7_000);
}

#[test]
fn parse_rejects_malformed() {
    for bad in [
        "",
        "00:00",
        "00:00:00:00",
        "aa:00:00.000",
        "00:60:00.000",
        "00:00:60.000",
        "00:00:01.1234",
        "00:00:01.x",
        "-1:00:00.000",
        "10000000000000:00:00.000",
        "99999999999999999999:00:00.000",
    ] {
        let result = Timestamp::parse(bad);
        assert!(
            matches!(result, Err(StillcutError::InvalidTimestamp { .. })),
            "expected InvalidTimestamp for {bad:?}, got {result:?}"
        );
    }
}

#[test]
fn error_message_names_value() {
    let error = Timestamp::parse("nonsense").unwrap_err();
    assert!(error.to_string().contains("nonsense"));
    assert!(error.is_precondition());
}

#[test]
fn from_secs_rounds_to_millis() {
    assert_eq!(Timestamp::from_secs_f64(90.5).digits(), "000130500");
    assert_eq!(Timestamp::from_secs_f64(1.0004).as_millis(), 1_000);
    assert_eq!(Timestamp::from_secs_f64(-3.0), Timestamp::ZERO);
    assert_eq!(Timestamp::from_secs_f64(f64::NAN), Timestamp::ZERO);
}

#[test]
fn serde_uses_canonical_string() {
    let timestamp: Timestamp = serde_json::from_str("\"00:00:15,25\"").unwrap();
    assert_eq!(timestamp.as_millis(), 15_250);
    assert_eq!(serde_json::to_string(&timestamp).unwrap(), "\"00:00:15.250\"");

    assert!(serde_json::from_str::<Timestamp>("\"later\"").is_err());
}

#[test]
fn ordering_follows_time() {
    let earlier = Timestamp::parse("00:00:59.999").unwrap();
    let later = Timestamp::parse("00:01:00.000").unwrap();
    assert!(earlier < later);
}
