//! Console driver — line-oriented stand-in for the UI boundary.
//!
//! Each input line is one UI event: a button press, the Enter key in the
//! chat box, a file-input change, or a native `timeupdate` from the
//! simulated element. Errors are logged and the loop keeps going; only
//! `quit` or end of input stops it.
//!
//! ```text
//! play | pause         toggle playback
//! seek <secs>          jump to a position
//! rewind | forward     step back/forward
//! tick <secs>          advance the element and deliver a timeupdate
//! say <text>           send a chat message
//! unsend <id>          unsend one of your messages
//! upload [name [mime]] pick a file (no name = picker dismissed)
//! chat | media | status
//! quit
//! ```

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::element::{MediaElement, SimulatedElement};
use crate::frame::{ErrorCode, FRAME_CODE, FRAME_MESSAGE, Frame, Status};
use crate::party::{Outcome, UiEvent, WatchParty};
use crate::services::media::FileHandle;

// =============================================================================
// COMMANDS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ui(UiEvent),
    /// Advance the simulated element, then deliver a `timeupdate`.
    Tick(f64),
    Chat,
    Media,
    Status,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("{command} needs {argument}")]
    MissingArgument { command: &'static str, argument: &'static str },
    #[error("{command}: '{raw}' is not a number")]
    InvalidNumber { command: &'static str, raw: String },
}

impl ErrorCode for ParseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "E_EMPTY_LINE",
            Self::UnknownCommand(_) => "E_UNKNOWN_COMMAND",
            Self::MissingArgument { .. } => "E_MISSING_ARGUMENT",
            Self::InvalidNumber { .. } => "E_INVALID_NUMBER",
        }
    }
}

/// Parse one input line.
///
/// # Errors
///
/// Returns a `ParseError` describing why the line is not a command.
pub fn parse_line(line: &str) -> Result<Command, ParseError> {
    let line = line.trim_start();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }
    // `raw` keeps everything after the separator for chat text.
    let (verb, raw) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = raw.trim();

    let command = match verb.to_ascii_lowercase().as_str() {
        "play" | "pause" | "toggle" => Command::Ui(UiEvent::TogglePlayPause),
        "seek" => Command::Ui(UiEvent::Seek(parse_number("seek", "a position in seconds", rest)?)),
        "rewind" => Command::Ui(UiEvent::Rewind),
        "forward" => Command::Ui(UiEvent::Forward),
        "tick" => Command::Tick(parse_number("tick", "a duration in seconds", rest)?),
        // Text goes through as typed; the ledger refuses blank text.
        "say" => Command::Ui(UiEvent::SendMessage(raw.to_string())),
        "unsend" => {
            if rest.is_empty() {
                return Err(ParseError::MissingArgument { command: "unsend", argument: "a message id" });
            }
            let id = rest
                .parse::<u64>()
                .map_err(|_| ParseError::InvalidNumber { command: "unsend", raw: rest.to_string() })?;
            Command::Ui(UiEvent::UnsendMessage(id))
        }
        "upload" => Command::Ui(UiEvent::Upload(parse_file(rest))),
        "chat" => Command::Chat,
        "media" => Command::Media,
        "status" => Command::Status,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(command)
}

fn parse_number(command: &'static str, argument: &'static str, raw: &str) -> Result<f64, ParseError> {
    if raw.is_empty() {
        return Err(ParseError::MissingArgument { command, argument });
    }
    raw.parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber { command, raw: raw.to_string() })
}

fn parse_file(raw: &str) -> Option<FileHandle> {
    let mut parts = raw.split_whitespace();
    let name = parts.next()?;
    let mime_type = parts.next().unwrap_or_default();
    Some(FileHandle::new(name, mime_type, 0))
}

// =============================================================================
// DRIVER
// =============================================================================

/// Drive `party` from `input` until `quit` or end of input.
///
/// # Errors
///
/// Returns I/O errors from reading `input` or writing `output`.
pub async fn run<R, W>(party: &mut WatchParty<SimulatedElement>, input: R, output: &mut W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(ParseError::Empty) => continue,
            Err(e) => {
                warn!(code = e.error_code(), error = %e, "unrecognized input");
                output.write_all(format!("? {e}\n").as_bytes()).await?;
                continue;
            }
        };

        let reply = match command {
            Command::Quit => break,
            Command::Help => HELP.to_string(),
            Command::Status => status_line(party),
            Command::Chat => chat_listing(party),
            Command::Media => media_listing(party),
            Command::Tick(dt) => {
                party.element_mut().advance(dt);
                apply(party, UiEvent::TimeUpdate)
            }
            Command::Ui(event) => apply(party, event),
        };
        output.write_all(reply.as_bytes()).await?;
        output.flush().await?;
    }
    Ok(())
}

const HELP: &str = "play | seek <secs> | rewind | forward | tick <secs> | say <text> | unsend <id> | \
                    upload [name [mime]] | chat | media | status | quit\n";

fn apply(party: &mut WatchParty<SimulatedElement>, event: UiEvent) -> String {
    match party.dispatch(event) {
        Ok(Outcome::Transport(_) | Outcome::Tick(_)) => status_line(party),
        Ok(Outcome::MessageSent(msg)) => format!("sent #{}\n", msg.id),
        Ok(Outcome::MessageUnsent(id)) => format!("unsent #{id}\n"),
        Ok(Outcome::Uploaded(item)) => format!("uploaded #{} as {}\n", item.id, item.kind.as_str()),
        Err(e) => {
            warn!(code = e.error_code(), error = %e, "event refused");
            format!("! {e}\n")
        }
    }
}

fn status_line(party: &WatchParty<SimulatedElement>) -> String {
    let session = party.session();
    format!(
        "{} | {} | {:.2}s (element {:.2}s)\n",
        if session.is_leader() { "leader" } else { "follower" },
        if session.is_playing { "playing" } else { "paused" },
        session.current_time,
        party.element().current_time(),
    )
}

fn chat_listing(party: &WatchParty<SimulatedElement>) -> String {
    let mut out = String::new();
    for msg in party.messages() {
        out.push_str(&format!("#{} {}: {}\n", msg.id, msg.author, msg.text));
    }
    if out.is_empty() {
        out.push_str("(no messages)\n");
    }
    out
}

fn media_listing(party: &WatchParty<SimulatedElement>) -> String {
    let mut out = String::new();
    for item in party.media() {
        out.push_str(&format!(
            "#{} {} {} by {} ({})\n",
            item.id,
            item.kind.as_str(),
            item.file_name,
            item.author,
            item.resource
        ));
    }
    if out.is_empty() {
        out.push_str("(no media)\n");
    }
    out
}

// =============================================================================
// FOLLOWER REPLICA
// =============================================================================

/// Run a follower replica that applies every frame from `rx` until the
/// channel closes, then hands the party back.
///
/// Each frame is answered on `replies`: `done` when applied, an error reply
/// carrying the refusal code otherwise.
pub fn spawn_follower<E>(
    mut party: WatchParty<E>,
    mut rx: mpsc::Receiver<Frame>,
    replies: mpsc::Sender<Frame>,
) -> JoinHandle<WatchParty<E>>
where
    E: MediaElement + Send + 'static,
{
    tokio::spawn(async move {
        let participant_id = party.session().participant_id;
        while let Some(frame) = rx.recv().await {
            let reply = match party.handle_frame(&frame) {
                Ok(applied) => {
                    info!(
                        %participant_id,
                        syscall = %frame.syscall,
                        ?applied,
                        is_playing = party.session().is_playing,
                        current_time = party.session().current_time,
                        "follower applied frame"
                    );
                    frame.done()
                }
                Err(e) => {
                    warn!(%participant_id, code = e.error_code(), error = %e, syscall = %frame.syscall, "follower refused frame");
                    frame.error_from(&e)
                }
            };
            if replies.try_send(reply.with_from(participant_id)).is_err() {
                debug!(%participant_id, syscall = %frame.syscall, "reply queue unavailable; reply dropped");
            }
        }
        party
    })
}

/// Replies a leader collected from its followers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTally {
    pub done: u64,
    pub errors: u64,
}

/// Count follower replies until every reply sender is dropped.
pub fn spawn_reply_collector(mut rx: mpsc::Receiver<Frame>) -> JoinHandle<ReplyTally> {
    tokio::spawn(async move {
        let mut tally = ReplyTally::default();
        while let Some(reply) = rx.recv().await {
            if !reply.status.is_terminal() {
                debug!(syscall = %reply.syscall, "non-terminal reply ignored");
                continue;
            }
            if reply.status == Status::Error {
                tally.errors += 1;
                warn!(
                    from = ?reply.from,
                    parent_id = ?reply.parent_id,
                    syscall = %reply.syscall,
                    code = reply.data_str(FRAME_CODE).unwrap_or_default(),
                    message = reply.data_str(FRAME_MESSAGE).unwrap_or_default(),
                    "follower reported an error"
                );
            } else {
                tally.done += 1;
            }
        }
        tally
    })
}

#[cfg(test)]
#[path = "console_test.rs"]
mod tests;
