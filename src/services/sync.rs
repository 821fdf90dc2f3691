//! Sync service — keeps each participant's element in step with the leader.
//!
//! ARCHITECTURE
//! ============
//! Leader side: every authoritative `TransportEvent` is wrapped in a frame,
//! logged, and fanned out to attached followers. A follower attaching
//! mid-session first receives a `session:snapshot` frame.
//!
//! Follower side: `apply_remote` accepts frames only from the session
//! leader, writes the carried values into the local `Session`, and forces
//! the local element to match in the same call. Because it holds `&mut` to
//! both, no clock tick can be observed between the session write and the
//! element write; the element then stays `seeking` until the seek settles,
//! which the clock service honours.
//!
//! Chat and gallery frames pass the same session and leader checks, then
//! decode into the records the follower's ledger and gallery replicate.

use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::element::MediaElement;
use crate::frame::{
    Data, ErrorCode, Frame, SYSCALL_CHAT_SEND, SYSCALL_CHAT_UNSEND, SYSCALL_MEDIA_UPLOAD, SYSCALL_SESSION_SNAPSHOT,
    SYSCALL_TRANSPORT_SEEK, SYSCALL_TRANSPORT_STATE,
};
use crate::services::broadcast::Fanout;
use crate::services::chat::Message;
use crate::services::media::{MediaItem, MediaKind, ResourceRef};
use crate::services::transport::TransportEvent;
use crate::state::{PlaybackSnapshot, Session};

/// Element and session positions closer than this are considered in sync.
pub const DRIFT_TOLERANCE_SECS: f64 = 0.001;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SyncError {
    #[error("frame from {from:?} rejected: session leader is {leader_id}")]
    NotFromLeader { from: Option<Uuid>, leader_id: Uuid },
    #[error("frame for session {got:?} rejected: local session is {expected}")]
    WrongSession { got: Option<Uuid>, expected: Uuid },
    #[error("malformed {syscall} frame: missing or invalid `{field}`")]
    MalformedFrame { syscall: String, field: &'static str },
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
}

impl ErrorCode for SyncError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFromLeader { .. } => "E_NOT_FROM_LEADER",
            Self::WrongSession { .. } => "E_WRONG_SESSION",
            Self::MalformedFrame { .. } => "E_MALFORMED_FRAME",
            Self::UnknownSyscall(_) => "E_UNKNOWN_SYSCALL",
        }
    }
}

/// What a follower did with a remote frame.
///
/// Playback variants are already applied to the session and element. Chat
/// and gallery variants carry the decoded record for the caller to store.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Transport(TransportEvent),
    Snapshot(PlaybackSnapshot),
    MessageSent(Message),
    MessageUnsent(u64),
    Uploaded(MediaItem),
}

// =============================================================================
// COORDINATOR
// =============================================================================

#[derive(Debug, Default)]
pub struct SyncCoordinator {
    fanout: Fanout,
    published: u64,
    applied: u64,
}

impl SyncCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fanout(&self) -> &Fanout {
        &self.fanout
    }

    /// Frames handed to the fan-out so far.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Remote frames applied so far.
    #[must_use]
    pub fn applied(&self) -> u64 {
        self.applied
    }

    // -------------------------------------------------------------------------
    // Local reconciliation
    // -------------------------------------------------------------------------

    /// Bring a freshly mounted element up to the session's state before
    /// playback proceeds. This is how a late joiner catches up.
    pub fn bootstrap<E>(&self, session: &Session, element: &mut E)
    where
        E: MediaElement + ?Sized,
    {
        self.reconcile(session, element);
        match (session.is_playing, element.is_paused()) {
            (true, true) => element.play(),
            (false, false) => element.pause(),
            _ => {}
        }
        info!(
            session_id = %session.id,
            participant_id = %session.participant_id,
            current_time = session.current_time,
            is_playing = session.is_playing,
            "element synced to session"
        );
    }

    /// Force the element position to the session position if they drifted.
    /// Returns `true` if the element was moved.
    pub fn reconcile<E>(&self, session: &Session, element: &mut E) -> bool
    where
        E: MediaElement + ?Sized,
    {
        if (element.current_time() - session.current_time).abs() <= DRIFT_TOLERANCE_SECS {
            return false;
        }
        element.set_current_time(session.current_time);
        true
    }

    // -------------------------------------------------------------------------
    // Leader side
    // -------------------------------------------------------------------------

    /// Full playback state for a participant joining mid-session.
    #[must_use]
    pub fn snapshot_frame(&self, session: &Session) -> Frame {
        let snapshot = session.snapshot();
        Frame::request(SYSCALL_SESSION_SNAPSHOT, Data::new())
            .with_session_id(session.id)
            .with_from(session.participant_id)
            .with_data("is_playing", snapshot.is_playing)
            .with_data("current_time", snapshot.current_time)
    }

    /// Attach a participant and send it the current snapshot.
    /// Returns `false` if the snapshot could not be queued.
    pub fn attach(&mut self, session: &Session, participant_id: Uuid, tx: mpsc::Sender<Frame>) -> bool {
        self.fanout.join(participant_id, tx);
        let frame = self.snapshot_frame(session);
        info!(session_id = %session.id, %participant_id, "participant attached");
        self.fanout.send_to(participant_id, &frame)
    }

    /// Detach a participant. Returns `false` if it was not attached.
    pub fn detach(&mut self, participant_id: Uuid) -> bool {
        self.fanout.part(participant_id)
    }

    /// Publish an authoritative transport change.
    /// Returns how many participants received it.
    pub fn publish(&mut self, session: &Session, event: TransportEvent) -> usize {
        self.publish_frame(session, transport_frame(event))
    }

    /// Stamp `frame` with the session and sender, log it, and fan it out to
    /// everyone but the sender.
    pub fn publish_frame(&mut self, session: &Session, frame: Frame) -> usize {
        let frame = frame.with_session_id(session.id).with_from(session.participant_id);
        self.fanout.prune_closed();
        let delivered = self.fanout.broadcast(&frame, Some(session.participant_id));
        self.published += 1;

        info!(
            session_id = %session.id,
            syscall = %frame.syscall,
            data = ?frame.data,
            delivered,
            "session event published"
        );
        delivered
    }

    // -------------------------------------------------------------------------
    // Follower side
    // -------------------------------------------------------------------------

    /// Apply a frame received from the session leader.
    ///
    /// # Errors
    ///
    /// Returns `WrongSession` or `NotFromLeader` for frames that are not the
    /// leader's for this session, `MalformedFrame` when a required field is
    /// missing, and `UnknownSyscall` for unrecognized syscalls.
    pub fn apply_remote<E>(&mut self, session: &mut Session, element: &mut E, frame: &Frame) -> Result<Applied, SyncError>
    where
        E: MediaElement + ?Sized,
    {
        if frame.session_id != Some(session.id) {
            return Err(SyncError::WrongSession { got: frame.session_id, expected: session.id });
        }
        let leader_id = session.role().leader_id();
        if frame.from != Some(leader_id) {
            return Err(SyncError::NotFromLeader { from: frame.from, leader_id });
        }

        let applied = match frame.syscall.as_str() {
            SYSCALL_TRANSPORT_STATE => {
                let is_playing = require_bool(frame, "is_playing")?;
                session.is_playing = is_playing;
                if is_playing {
                    element.play();
                } else {
                    element.pause();
                }
                Applied::Transport(TransportEvent::PlayState { is_playing })
            }
            SYSCALL_TRANSPORT_SEEK => {
                let current_time = require_time(frame, "current_time")?;
                session.current_time = current_time;
                self.reconcile(session, element);
                Applied::Transport(TransportEvent::Seek { current_time })
            }
            SYSCALL_SESSION_SNAPSHOT => {
                let snapshot = PlaybackSnapshot {
                    is_playing: require_bool(frame, "is_playing")?,
                    current_time: require_time(frame, "current_time")?,
                };
                session.is_playing = snapshot.is_playing;
                session.current_time = snapshot.current_time;
                self.bootstrap(session, element);
                Applied::Snapshot(snapshot)
            }
            SYSCALL_CHAT_SEND => Applied::MessageSent(Message {
                id: require_u64(frame, "message_id")?,
                author: require_str(frame, "author")?,
                text: require_str(frame, "text")?,
                created_at: require_i64(frame, "created_at")?,
                visible: true,
            }),
            SYSCALL_CHAT_UNSEND => Applied::MessageUnsent(require_u64(frame, "message_id")?),
            SYSCALL_MEDIA_UPLOAD => Applied::Uploaded(MediaItem {
                id: require_u64(frame, "media_id")?,
                author: require_str(frame, "author")?,
                resource: ResourceRef::new(require_str(frame, "resource")?),
                kind: require_kind(frame)?,
                file_name: require_str(frame, "file_name")?,
                mime_type: require_str(frame, "mime_type")?,
                uploaded_at: require_i64(frame, "uploaded_at")?,
            }),
            other => return Err(SyncError::UnknownSyscall(other.to_string())),
        };

        self.applied += 1;
        debug!(session_id = %session.id, syscall = %frame.syscall, "remote frame applied");
        Ok(applied)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Wire shape of an authoritative transport change.
#[must_use]
pub fn transport_frame(event: TransportEvent) -> Frame {
    match event {
        TransportEvent::PlayState { is_playing } => {
            Frame::request(SYSCALL_TRANSPORT_STATE, Data::new()).with_data("is_playing", is_playing)
        }
        TransportEvent::Seek { current_time } => {
            Frame::request(SYSCALL_TRANSPORT_SEEK, Data::new()).with_data("current_time", current_time)
        }
    }
}

fn require_bool(frame: &Frame, field: &'static str) -> Result<bool, SyncError> {
    frame.data_bool(field).ok_or_else(|| malformed(frame, field))
}

fn require_u64(frame: &Frame, field: &'static str) -> Result<u64, SyncError> {
    frame.data_u64(field).ok_or_else(|| malformed(frame, field))
}

fn require_i64(frame: &Frame, field: &'static str) -> Result<i64, SyncError> {
    frame.data_i64(field).ok_or_else(|| malformed(frame, field))
}

fn require_str(frame: &Frame, field: &'static str) -> Result<String, SyncError> {
    frame.data_str(field).map(str::to_string).ok_or_else(|| malformed(frame, field))
}

fn require_kind(frame: &Frame) -> Result<MediaKind, SyncError> {
    match frame.data_str("kind") {
        Some("image") => Ok(MediaKind::Image),
        Some("video") => Ok(MediaKind::Video),
        _ => Err(malformed(frame, "kind")),
    }
}

fn malformed(frame: &Frame, field: &'static str) -> SyncError {
    SyncError::MalformedFrame { syscall: frame.syscall.clone(), field }
}

fn require_time(frame: &Frame, field: &'static str) -> Result<f64, SyncError> {
    frame
        .data_f64(field)
        .filter(|t| t.is_finite())
        .ok_or_else(|| malformed(frame, field))
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
