use super::test_helpers::{follower_session, leader_session};
use super::*;

#[test]
fn session_starts_paused_at_zero() {
    let (session, _) = leader_session();
    assert!(!session.is_playing);
    assert_eq!(session.current_time, 0.0);
    assert!(session.started_at > 0);
    assert!(!session.is_ended());
    assert!(session.is_leader());
}

#[test]
fn follower_shares_session_id_and_points_at_leader() {
    let (leader, leadership) = leader_session();
    let follower = follower_session(&leadership);
    assert_eq!(follower.id, leader.id);
    assert!(!follower.is_leader());
    assert_eq!(follower.role().leader_id(), leader.participant_id);
    assert_ne!(follower.participant_id, leader.participant_id);
}

#[test]
fn snapshot_mirrors_playback_fields() {
    let (mut session, _) = leader_session();
    session.is_playing = true;
    session.current_time = 12.5;
    assert_eq!(session.snapshot(), PlaybackSnapshot { is_playing: true, current_time: 12.5 });
}

#[test]
fn end_is_one_shot_and_stops_playback() {
    let (mut session, _) = leader_session();
    session.is_playing = true;

    assert!(session.end());
    assert!(session.is_ended());
    assert!(!session.is_playing);
    let ended_at = session.ended_at();
    assert!(ended_at.is_some());

    assert!(!session.end());
    assert_eq!(session.ended_at(), ended_at);
}

#[test]
fn snapshot_serde_round_trip() {
    let snap = PlaybackSnapshot { is_playing: false, current_time: 45.0 };
    let json = serde_json::to_string(&snap).unwrap();
    let restored: PlaybackSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, snap);
}
