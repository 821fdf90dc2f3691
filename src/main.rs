use std::error::Error;

use cinesync::config::SessionConfig;
use cinesync::console;
use cinesync::element::SimulatedElement;
use cinesync::party::WatchParty;
use cinesync::services::role::{Leadership, SessionRole};
use cinesync::state::Session;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let config = SessionConfig::from_env()?;
    tracing::info!(
        video_src = %config.video_src,
        seek_policy = ?config.seek_policy,
        seek_step_secs = config.seek_step_secs,
        "cinesync starting"
    );

    // Establish the session: the local participant claims leadership first.
    let session_id = Uuid::new_v4();
    let mut leadership = Leadership::new(session_id);
    let leader_id = Uuid::new_v4();
    let token = leadership.issue(leader_id)?;
    let mut leader = WatchParty::join(
        Session::start(session_id, leader_id, SessionRole::Leader(token)),
        SimulatedElement::new(config.video_src.clone(), config.video_duration_secs),
        &leadership,
        &config,
    )?;

    // One in-process follower replica watches along.
    let follower_config = SessionConfig { author: format!("{}-replica", config.author), ..config.clone() };
    let follower_session = Session::start(session_id, Uuid::new_v4(), leadership.follower_role()?);
    let follower_id = follower_session.participant_id;
    let follower = WatchParty::join(
        follower_session,
        SimulatedElement::new(config.video_src.clone(), config.video_duration_secs),
        &leadership,
        &follower_config,
    )?;
    let (tx, rx) = mpsc::channel(config.event_queue_capacity);
    let (reply_tx, reply_rx) = mpsc::channel(config.event_queue_capacity);
    let replica = console::spawn_follower(follower, rx, reply_tx);
    let replies = console::spawn_reply_collector(reply_rx);
    leader.attach(follower_id, tx);

    let mut stdout = tokio::io::stdout();
    console::run(&mut leader, BufReader::new(tokio::io::stdin()), &mut stdout).await?;

    leader.end();
    drop(leader);

    let mut follower = replica.await?;
    let tally = replies.await?;
    tracing::info!(
        is_playing = follower.session().is_playing,
        current_time = follower.session().current_time,
        frames_applied = follower.sync().applied(),
        messages = follower.messages().count(),
        replies_done = tally.done,
        replies_failed = tally.errors,
        "follower replica finished"
    );
    follower.end();

    Ok(())
}
