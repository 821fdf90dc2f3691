use super::*;
use crate::config::SeekPolicy;
use crate::element::{ElementCommand, SimulatedElement};
use crate::frame::{SYSCALL_CHAT_UNSEND, Status};
use crate::services::chat::{ChatLedger, unsend_frame};
use crate::services::clock::{Tick, TimeTracker};
use crate::services::media::{FileHandle, MediaGallery};
use crate::services::transport::TransportController;
use crate::state::test_helpers::{follower_session, leader_session};
use tokio::time::{Duration, timeout};

fn element() -> SimulatedElement {
    SimulatedElement::new("movie.mp4", 120.0)
}

async fn recv_frame(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("frame receive timed out")
        .expect("channel closed")
}

// =============================================================================
// bootstrap / reconcile
// =============================================================================

#[test]
fn bootstrap_moves_late_joiner_to_session_state() {
    let (_, leadership) = leader_session();
    let mut follower = follower_session(&leadership);
    follower.current_time = 33.0;
    follower.is_playing = true;
    let mut el = element();

    SyncCoordinator::new().bootstrap(&follower, &mut el);

    assert!((el.current_time() - 33.0).abs() < f64::EPSILON);
    assert!(!el.is_paused());
    assert_eq!(el.commands(), &[ElementCommand::SetCurrentTime(33.0), ElementCommand::Play]);
}

#[test]
fn reconcile_is_noop_when_in_sync() {
    let (session, _) = leader_session();
    let mut el = element();
    assert!(!SyncCoordinator::new().reconcile(&session, &mut el));
    assert!(el.commands().is_empty());
}

// =============================================================================
// apply_remote
// =============================================================================

#[test]
fn follower_converges_on_leader_events() {
    let (mut leader, leadership) = leader_session();
    let mut follower = follower_session(&leadership);
    let mut leader_el = element();
    let mut follower_el = element();
    let transport = TransportController::new(10.0, SeekPolicy::PassThrough);
    let mut leader_sync = SyncCoordinator::new();
    let mut follower_sync = SyncCoordinator::new();

    let seek = transport.seek(&mut leader, &mut leader_el, 45.0).unwrap();
    let play = transport.toggle_play_pause(&mut leader, &mut leader_el).unwrap();

    for event in [seek, play] {
        let frame = transport_frame(event)
            .with_session_id(leader.id)
            .with_from(leader.participant_id);
        let applied = follower_sync.apply_remote(&mut follower, &mut follower_el, &frame).unwrap();
        assert_eq!(applied, Applied::Transport(event));
        leader_sync.publish(&leader, event);
    }

    assert_eq!(follower.snapshot(), leader.snapshot());
    assert!((follower_el.current_time() - 45.0).abs() < f64::EPSILON);
    assert!(!follower_el.is_paused());
    assert_eq!(follower_sync.applied(), 2);
    assert_eq!(leader_sync.published(), 2);
}

#[test]
fn tick_between_apply_and_seek_completion_keeps_leader_time() {
    let (leader, leadership) = leader_session();
    let mut follower = follower_session(&leadership);
    let mut el = element();
    let mut tracker = TimeTracker::new();
    let mut sync = SyncCoordinator::new();

    let frame = transport_frame(TransportEvent::Seek { current_time: 80.0 })
        .with_session_id(leader.id)
        .with_from(leader.participant_id);
    sync.apply_remote(&mut follower, &mut el, &frame).unwrap();

    assert_eq!(tracker.on_time_update(&mut follower, &el), Tick::SkippedWhileSeeking);
    assert!((follower.current_time - 80.0).abs() < f64::EPSILON);

    el.complete_seek();
    assert_eq!(tracker.on_time_update(&mut follower, &el), Tick::Observed(80.0));
}

#[test]
fn frames_not_from_leader_are_rejected() {
    let (leader, leadership) = leader_session();
    let mut follower = follower_session(&leadership);
    let mut el = element();
    let impostor = Uuid::new_v4();

    let frame = transport_frame(TransportEvent::PlayState { is_playing: true })
        .with_session_id(leader.id)
        .with_from(impostor);
    let err = SyncCoordinator::new()
        .apply_remote(&mut follower, &mut el, &frame)
        .unwrap_err();

    assert_eq!(err, SyncError::NotFromLeader { from: Some(impostor), leader_id: leader.participant_id });
    assert_eq!(err.error_code(), "E_NOT_FROM_LEADER");
    assert!(!follower.is_playing);
    assert!(el.commands().is_empty());
}

#[test]
fn frames_for_other_sessions_are_rejected() {
    let (leader, leadership) = leader_session();
    let mut follower = follower_session(&leadership);
    let mut el = element();

    let frame = transport_frame(TransportEvent::Seek { current_time: 5.0 })
        .with_session_id(Uuid::new_v4())
        .with_from(leader.participant_id);
    let err = SyncCoordinator::new()
        .apply_remote(&mut follower, &mut el, &frame)
        .unwrap_err();
    assert!(matches!(err, SyncError::WrongSession { .. }));
    assert_eq!(follower.current_time, 0.0);
}

#[test]
fn malformed_and_unknown_frames_are_rejected() {
    let (leader, leadership) = leader_session();
    let mut follower = follower_session(&leadership);
    let mut el = element();
    let mut sync = SyncCoordinator::new();

    let missing = Frame::request(SYSCALL_TRANSPORT_SEEK, Data::new())
        .with_session_id(leader.id)
        .with_from(leader.participant_id);
    let err = sync.apply_remote(&mut follower, &mut el, &missing).unwrap_err();
    assert_eq!(
        err,
        SyncError::MalformedFrame { syscall: SYSCALL_TRANSPORT_SEEK.to_string(), field: "current_time" }
    );

    let wrong_type = Frame::request(SYSCALL_TRANSPORT_STATE, Data::new())
        .with_session_id(leader.id)
        .with_from(leader.participant_id)
        .with_data("is_playing", "yes");
    assert!(matches!(
        sync.apply_remote(&mut follower, &mut el, &wrong_type),
        Err(SyncError::MalformedFrame { field: "is_playing", .. })
    ));

    let unknown = Frame::request("transport:rewind", Data::new())
        .with_session_id(leader.id)
        .with_from(leader.participant_id);
    assert_eq!(
        sync.apply_remote(&mut follower, &mut el, &unknown),
        Err(SyncError::UnknownSyscall("transport:rewind".into()))
    );
    assert_eq!(sync.applied(), 0);
}

#[test]
fn chat_and_media_frames_decode_without_touching_playback() {
    let (leader, leadership) = leader_session();
    let mut follower = follower_session(&leadership);
    let mut el = element();
    let mut sync = SyncCoordinator::new();
    let stamp = |frame: Frame| frame.with_session_id(leader.id).with_from(leader.participant_id);

    let mut ledger = ChatLedger::new();
    let sent = ledger.send("leader", "  hi  ").unwrap().clone();
    let applied = sync.apply_remote(&mut follower, &mut el, &stamp(sent.to_frame())).unwrap();
    assert_eq!(applied, Applied::MessageSent(sent));

    let applied = sync.apply_remote(&mut follower, &mut el, &stamp(unsend_frame(1))).unwrap();
    assert_eq!(applied, Applied::MessageUnsent(1));

    let mut gallery = MediaGallery::new();
    let item = gallery.upload("leader", FileHandle::new("clip.mp4", "video/mp4", 9)).clone();
    let applied = sync.apply_remote(&mut follower, &mut el, &stamp(item.to_frame())).unwrap();
    assert_eq!(applied, Applied::Uploaded(item));

    assert_eq!(sync.applied(), 3);
    assert!(el.commands().is_empty());
    assert_eq!(follower.snapshot(), PlaybackSnapshot { is_playing: false, current_time: 0.0 });
}

#[test]
fn chat_and_media_frames_need_their_fields() {
    let (leader, leadership) = leader_session();
    let mut follower = follower_session(&leadership);
    let mut el = element();
    let mut sync = SyncCoordinator::new();

    let unsend = Frame::request(SYSCALL_CHAT_UNSEND, Data::new())
        .with_session_id(leader.id)
        .with_from(leader.participant_id)
        .with_data("message_id", "one");
    assert!(matches!(
        sync.apply_remote(&mut follower, &mut el, &unsend),
        Err(SyncError::MalformedFrame { field: "message_id", .. })
    ));

    let mut gallery = MediaGallery::new();
    let mut upload = gallery
        .upload("leader", FileHandle::new("a.png", "image/png", 1))
        .to_frame()
        .with_session_id(leader.id)
        .with_from(leader.participant_id);
    upload.data.insert("kind".into(), "audio".into());
    assert!(matches!(
        sync.apply_remote(&mut follower, &mut el, &upload),
        Err(SyncError::MalformedFrame { field: "kind", .. })
    ));
    assert_eq!(sync.applied(), 0);
}

// =============================================================================
// attach / publish
// =============================================================================

#[tokio::test]
async fn late_joiner_catches_up_from_snapshot() {
    let (mut leader, leadership) = leader_session();
    let mut leader_el = element();
    let transport = TransportController::new(10.0, SeekPolicy::PassThrough);
    let mut leader_sync = SyncCoordinator::new();

    transport.seek(&mut leader, &mut leader_el, 60.0).unwrap();
    transport.toggle_play_pause(&mut leader, &mut leader_el).unwrap();

    let mut follower = follower_session(&leadership);
    let mut follower_el = element();
    let (tx, mut rx) = mpsc::channel(8);
    assert!(leader_sync.attach(&leader, follower.participant_id, tx));

    let frame = recv_frame(&mut rx).await;
    assert_eq!(frame.syscall, SYSCALL_SESSION_SNAPSHOT);
    assert_eq!(frame.status, Status::Request);

    let mut follower_sync = SyncCoordinator::new();
    let applied = follower_sync.apply_remote(&mut follower, &mut follower_el, &frame).unwrap();
    assert_eq!(applied, Applied::Snapshot(PlaybackSnapshot { is_playing: true, current_time: 60.0 }));
    assert!((follower_el.current_time() - 60.0).abs() < f64::EPSILON);
    assert!(!follower_el.is_paused());
}

#[tokio::test]
async fn publish_reaches_followers_but_not_sender() {
    let (mut leader, leadership) = leader_session();
    let mut el = element();
    let transport = TransportController::new(10.0, SeekPolicy::PassThrough);
    let mut sync = SyncCoordinator::new();

    let follower = follower_session(&leadership);
    let (tx, mut rx) = mpsc::channel(8);
    sync.attach(&leader, follower.participant_id, tx);
    let (self_tx, mut self_rx) = mpsc::channel(8);
    sync.attach(&leader, leader.participant_id, self_tx);
    recv_frame(&mut rx).await;
    recv_frame(&mut self_rx).await;

    let event = transport.seek(&mut leader, &mut el, 12.0).unwrap();
    assert_eq!(sync.publish(&leader, event), 1);

    let frame = recv_frame(&mut rx).await;
    assert_eq!(frame.syscall, SYSCALL_TRANSPORT_SEEK);
    assert_eq!(frame.from, Some(leader.participant_id));
    assert_eq!(frame.session_id, Some(leader.id));
    assert_eq!(frame.data_f64("current_time"), Some(12.0));
    assert!(timeout(Duration::from_millis(80), self_rx.recv()).await.is_err());
}

#[test]
fn detach_and_closed_queues_are_pruned_on_publish() {
    let (leader, leadership) = leader_session();
    let mut sync = SyncCoordinator::new();
    let a = follower_session(&leadership);
    let b = follower_session(&leadership);
    let (tx_a, rx_a) = mpsc::channel(8);
    let (tx_b, _rx_b) = mpsc::channel(8);
    sync.attach(&leader, a.participant_id, tx_a);
    sync.attach(&leader, b.participant_id, tx_b);

    drop(rx_a);
    assert_eq!(sync.publish(&leader, TransportEvent::PlayState { is_playing: true }), 1);
    assert_eq!(sync.fanout().len(), 1);

    assert!(sync.detach(b.participant_id));
    assert!(sync.fanout().is_empty());
}
