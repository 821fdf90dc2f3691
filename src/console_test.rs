use super::*;
use crate::config::SessionConfig;
use crate::frame::{Data, FRAME_CODE, SYSCALL_TRANSPORT_STATE};
use crate::services::role::Leadership;
use crate::services::transport::TransportEvent;
use crate::state::test_helpers::{follower_session, leader_session};
use uuid::Uuid;

fn leader_party() -> (WatchParty<SimulatedElement>, Leadership) {
    let (session, leadership) = leader_session();
    let party = WatchParty::join(session, movie(), &leadership, &SessionConfig::default()).unwrap();
    (party, leadership)
}

fn follower_party(leadership: &Leadership) -> WatchParty<SimulatedElement> {
    WatchParty::join(follower_session(leadership), movie(), leadership, &SessionConfig::default()).unwrap()
}

fn movie() -> SimulatedElement {
    SimulatedElement::new("movie.mp4", 120.0)
}

// =============================================================================
// parse_line
// =============================================================================

#[test]
fn parses_transport_commands() {
    assert_eq!(parse_line("play").unwrap(), Command::Ui(UiEvent::TogglePlayPause));
    assert_eq!(parse_line("  PAUSE ").unwrap(), Command::Ui(UiEvent::TogglePlayPause));
    assert_eq!(parse_line("seek 45").unwrap(), Command::Ui(UiEvent::Seek(45.0)));
    assert_eq!(parse_line("rewind").unwrap(), Command::Ui(UiEvent::Rewind));
    assert_eq!(parse_line("forward").unwrap(), Command::Ui(UiEvent::Forward));
    assert_eq!(parse_line("tick 0.25").unwrap(), Command::Tick(0.25));
}

#[test]
fn parses_chat_and_upload_commands() {
    assert_eq!(
        parse_line("say hello   there").unwrap(),
        Command::Ui(UiEvent::SendMessage("hello   there".into()))
    );
    assert_eq!(parse_line("say").unwrap(), Command::Ui(UiEvent::SendMessage(String::new())));
    assert_eq!(
        parse_line("  say  spaced out  ").unwrap(),
        Command::Ui(UiEvent::SendMessage(" spaced out  ".into()))
    );
    assert_eq!(parse_line("unsend 3").unwrap(), Command::Ui(UiEvent::UnsendMessage(3)));
    assert_eq!(
        parse_line("upload cat.png image/png").unwrap(),
        Command::Ui(UiEvent::Upload(Some(FileHandle::new("cat.png", "image/png", 0))))
    );
    assert_eq!(
        parse_line("upload notes.pdf").unwrap(),
        Command::Ui(UiEvent::Upload(Some(FileHandle::new("notes.pdf", "", 0))))
    );
    assert_eq!(parse_line("upload").unwrap(), Command::Ui(UiEvent::Upload(None)));
}

#[test]
fn parse_errors_are_specific() {
    assert_eq!(parse_line("   "), Err(ParseError::Empty));
    assert_eq!(parse_line("dance"), Err(ParseError::UnknownCommand("dance".into())));
    assert_eq!(
        parse_line("seek"),
        Err(ParseError::MissingArgument { command: "seek", argument: "a position in seconds" })
    );
    assert_eq!(
        parse_line("seek soon"),
        Err(ParseError::InvalidNumber { command: "seek", raw: "soon".into() })
    );
    assert_eq!(
        parse_line("unsend one").unwrap_err().error_code(),
        "E_INVALID_NUMBER"
    );
}

// =============================================================================
// run
// =============================================================================

#[tokio::test]
async fn run_drives_party_and_reports() {
    let (mut party, _) = leader_party();
    let script = "seek 45\nplay\ntick 1\nsay hi\nsay   \nsay there\nunsend 1\nchat\nupload cat.png image/png\nmedia\nbogus\nquit\nplay\n";
    let mut out = Vec::new();

    run(&mut party, script.as_bytes(), &mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(out.contains("leader | paused | 45.00s"));
    assert!(out.contains("leader | playing | 46.00s"));
    assert!(out.contains("sent #1"));
    assert!(out.contains("! message text is empty"));
    assert!(out.contains("#2 User: there"));
    assert!(!out.contains("#1 User: hi"));
    assert!(out.contains("uploaded #1 as image"));
    assert!(out.contains("? unknown command: bogus"));

    // Lines after quit are not processed.
    assert!(party.session().is_playing);
}

#[tokio::test]
async fn follower_replica_applies_leader_frames() {
    let (mut leader, leadership) = leader_party();
    let follower = follower_party(&leadership);
    let follower_id = follower.session().participant_id;
    let (tx, rx) = mpsc::channel(16);
    let (reply_tx, reply_rx) = mpsc::channel(16);
    let handle = spawn_follower(follower, rx, reply_tx);
    let collector = spawn_reply_collector(reply_rx);

    assert!(leader.attach(follower_id, tx));
    assert_eq!(leader.seek(45.0).unwrap(), TransportEvent::Seek { current_time: 45.0 });
    leader.toggle_play_pause().unwrap();
    leader.send_message("hi").unwrap();
    leader.unsend_message(1).unwrap();

    // Dropping the leader closes the follower's queue.
    let expected = leader.session().snapshot();
    drop(leader);
    let follower = handle.await.unwrap();

    assert_eq!(follower.session().snapshot(), expected);
    assert!((follower.element().current_time() - 45.0).abs() < f64::EPSILON);
    assert!(!follower.element().is_paused());
    assert_eq!(follower.sync().applied(), 5);
    assert_eq!(follower.chat().len(), 1);
    assert_eq!(follower.messages().count(), 0);

    let tally = collector.await.unwrap();
    assert_eq!(tally, ReplyTally { done: 5, errors: 0 });
}

#[tokio::test]
async fn follower_replica_replies_with_refusals() {
    let (leader, leadership) = leader_party();
    let follower = follower_party(&leadership);
    let (tx, rx) = mpsc::channel(16);
    let (reply_tx, mut reply_rx) = mpsc::channel(16);
    let handle = spawn_follower(follower, rx, reply_tx);

    let forged = Frame::request(SYSCALL_TRANSPORT_STATE, Data::new())
        .with_session_id(leader.session().id)
        .with_from(Uuid::new_v4())
        .with_data("is_playing", true);
    tx.send(forged.clone()).await.unwrap();
    drop(tx);

    let reply = reply_rx.recv().await.unwrap();
    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.parent_id, Some(forged.id));
    assert_eq!(reply.data_str(FRAME_CODE), Some("E_NOT_FROM_LEADER"));

    let follower = handle.await.unwrap();
    assert_eq!(reply.from, Some(follower.session().participant_id));
    assert!(!follower.session().is_playing);
    assert!(reply_rx.recv().await.is_none());
}
