use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn empty_lookup_yields_defaults() {
    let cfg = SessionConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg, SessionConfig::default());
    assert_eq!(cfg.author, "User");
    assert!((cfg.seek_step_secs - 10.0).abs() < f64::EPSILON);
    assert_eq!(cfg.seek_policy, SeekPolicy::PassThrough);
    assert_eq!(cfg.video_src, DEFAULT_VIDEO_SRC);
    assert_eq!(cfg.event_queue_capacity, DEFAULT_EVENT_QUEUE_CAPACITY);
}

#[test]
fn values_are_read_from_lookup() {
    let cfg = SessionConfig::from_lookup(lookup_from(&[
        ("CINESYNC_AUTHOR", "  ada "),
        ("CINESYNC_SEEK_STEP_SECS", "5"),
        ("CINESYNC_SEEK_POLICY", "Clamp"),
        ("CINESYNC_VIDEO_SRC", "file:///movie.mp4"),
        ("CINESYNC_VIDEO_DURATION_SECS", "596.5"),
        ("CINESYNC_EVENT_QUEUE_CAPACITY", "8"),
    ]))
    .unwrap();

    assert_eq!(cfg.author, "ada");
    assert!((cfg.seek_step_secs - 5.0).abs() < f64::EPSILON);
    assert_eq!(cfg.seek_policy, SeekPolicy::Clamp);
    assert_eq!(cfg.video_src, "file:///movie.mp4");
    assert!((cfg.video_duration_secs - 596.5).abs() < f64::EPSILON);
    assert_eq!(cfg.event_queue_capacity, 8);
}

#[test]
fn unparsable_numbers_fall_back_to_defaults() {
    let cfg = SessionConfig::from_lookup(lookup_from(&[
        ("CINESYNC_SEEK_STEP_SECS", "ten"),
        ("CINESYNC_VIDEO_DURATION_SECS", "-3"),
        ("CINESYNC_EVENT_QUEUE_CAPACITY", "0"),
    ]))
    .unwrap();

    assert!((cfg.seek_step_secs - DEFAULT_SEEK_STEP_SECS).abs() < f64::EPSILON);
    assert!((cfg.video_duration_secs - DEFAULT_VIDEO_DURATION_SECS).abs() < f64::EPSILON);
    assert_eq!(cfg.event_queue_capacity, 1);
}

#[test]
fn blank_author_falls_back_to_default() {
    let cfg = SessionConfig::from_lookup(lookup_from(&[("CINESYNC_AUTHOR", "   ")])).unwrap();
    assert_eq!(cfg.author, DEFAULT_AUTHOR);
}

#[test]
fn unknown_seek_policy_is_an_error() {
    let err = SessionConfig::from_lookup(lookup_from(&[("CINESYNC_SEEK_POLICY", "wrap")])).unwrap_err();
    assert_eq!(err.error_code(), "E_CONFIG");
    assert!(err.to_string().contains("wrap"));
}

#[test]
fn seek_policy_parses_all_variants() {
    assert_eq!("passthrough".parse::<SeekPolicy>().unwrap(), SeekPolicy::PassThrough);
    assert_eq!("pass_through".parse::<SeekPolicy>().unwrap(), SeekPolicy::PassThrough);
    assert_eq!(" REJECT ".parse::<SeekPolicy>().unwrap(), SeekPolicy::Reject);
    assert_eq!("clamp".parse::<SeekPolicy>().unwrap(), SeekPolicy::Clamp);
}
