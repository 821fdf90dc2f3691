//! Watch party — one participant's view of a shared session.
//!
//! ARCHITECTURE
//! ============
//! `WatchParty` owns everything a participant holds: the session, the media
//! element, the chat ledger, the gallery, and the services that connect
//! them. UI events enter through `dispatch` (or the matching method), run
//! to completion, and publish whatever other participants need to see.
//!
//! ```text
//! UiEvent -> role gate -> transport -> element + session -> publish
//!   timeupdate -> clock -> session
//!   remote frame -> sync -> session + element
//! ```
//!
//! Joining checks the session role against the `Leadership` registry, then
//! mounts the element: it is brought to the session's playback state before
//! anything else runs. Ending the session pauses the element, tells
//! followers playback stopped, and refuses every later mutation with
//! `SessionEnded`.
//!
//! Followers replicate chat and gallery records from the leader's frames,
//! so an unsend on the leader hides the message everywhere.

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::element::MediaElement;
use crate::frame::{ErrorCode, Frame};
use crate::services::chat::{ChatError, ChatLedger, Message, unsend_frame};
use crate::services::clock::{Tick, TimeTracker};
use crate::services::media::{FileHandle, MediaGallery, MediaItem};
use crate::services::role::{Leadership, RoleError};
use crate::services::sync::{Applied, SyncCoordinator, SyncError};
use crate::services::transport::{TransportController, TransportError, TransportEvent};
use crate::state::Session;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PartyError {
    #[error("session {0} has ended")]
    SessionEnded(Uuid),
    #[error("no file selected")]
    NoFileSelected,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Role(#[from] RoleError),
}

impl ErrorCode for PartyError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::SessionEnded(_) => "E_SESSION_ENDED",
            Self::NoFileSelected => "E_NO_FILE",
            Self::Transport(e) => e.error_code(),
            Self::Chat(e) => e.error_code(),
            Self::Sync(e) => e.error_code(),
            Self::Role(e) => e.error_code(),
        }
    }
}

/// A discrete event from the UI boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    TogglePlayPause,
    Seek(f64),
    Rewind,
    Forward,
    /// Native `timeupdate` notification from the element.
    TimeUpdate,
    /// Enter pressed (or Send clicked) with the current input text.
    SendMessage(String),
    UnsendMessage(u64),
    /// File input changed. `None` when the picker was dismissed.
    Upload(Option<FileHandle>),
}

/// What a dispatched event did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Transport(TransportEvent),
    Tick(Tick),
    MessageSent(Message),
    MessageUnsent(u64),
    Uploaded(MediaItem),
}

// =============================================================================
// WATCH PARTY
// =============================================================================

pub struct WatchParty<E: MediaElement> {
    session: Session,
    author: String,
    element: E,
    transport: TransportController,
    clock: TimeTracker,
    sync: SyncCoordinator,
    chat: ChatLedger,
    gallery: MediaGallery,
}

impl<E: MediaElement> WatchParty<E> {
    /// Join `session` and mount `element`, syncing it to the session state.
    ///
    /// # Errors
    ///
    /// `Role` if `leadership` did not grant the session's role.
    pub fn join(
        session: Session,
        mut element: E,
        leadership: &Leadership,
        config: &SessionConfig,
    ) -> Result<Self, PartyError> {
        leadership.admit(session.id, session.role())?;

        let sync = SyncCoordinator::new();
        sync.bootstrap(&session, &mut element);
        info!(
            session_id = %session.id,
            participant_id = %session.participant_id,
            leader = session.is_leader(),
            author = %config.author,
            "joined watch party"
        );

        Ok(Self {
            session,
            author: config.author.clone(),
            element,
            transport: TransportController::from_config(config),
            clock: TimeTracker::new(),
            sync,
            chat: ChatLedger::new(),
            gallery: MediaGallery::new(),
        })
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    #[must_use]
    pub fn element(&self) -> &E {
        &self.element
    }

    /// Mutable access for the host driving native playback.
    pub fn element_mut(&mut self) -> &mut E {
        &mut self.element
    }

    #[must_use]
    pub fn clock(&self) -> &TimeTracker {
        &self.clock
    }

    #[must_use]
    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    /// Visible chat messages in send order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.chat.list()
    }

    #[must_use]
    pub fn chat(&self) -> &ChatLedger {
        &self.chat
    }

    /// Gallery items in upload order.
    pub fn media(&self) -> impl Iterator<Item = &MediaItem> + '_ {
        self.gallery.list()
    }

    // -------------------------------------------------------------------------
    // Participants
    // -------------------------------------------------------------------------

    /// Attach another participant's frame queue. It receives a snapshot
    /// first, then every event this participant publishes.
    pub fn attach(&mut self, participant_id: Uuid, tx: mpsc::Sender<Frame>) -> bool {
        self.sync.attach(&self.session, participant_id, tx)
    }

    pub fn detach(&mut self, participant_id: Uuid) -> bool {
        self.sync.detach(participant_id)
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// `SessionEnded` after `end`, `Transport(PermissionDenied)` for followers.
    pub fn toggle_play_pause(&mut self) -> Result<TransportEvent, PartyError> {
        self.ensure_active()?;
        let event = self.transport.toggle_play_pause(&mut self.session, &mut self.element)?;
        self.sync.publish(&self.session, event);
        Ok(event)
    }

    /// # Errors
    ///
    /// `SessionEnded` after `end`, otherwise any `TransportError`.
    pub fn seek(&mut self, target: f64) -> Result<TransportEvent, PartyError> {
        self.ensure_active()?;
        let event = self.transport.seek(&mut self.session, &mut self.element, target)?;
        self.sync.publish(&self.session, event);
        Ok(event)
    }

    /// # Errors
    ///
    /// Same as [`WatchParty::seek`].
    pub fn rewind(&mut self) -> Result<TransportEvent, PartyError> {
        self.ensure_active()?;
        let event = self.transport.rewind(&mut self.session, &mut self.element)?;
        self.sync.publish(&self.session, event);
        Ok(event)
    }

    /// # Errors
    ///
    /// Same as [`WatchParty::seek`].
    pub fn forward(&mut self) -> Result<TransportEvent, PartyError> {
        self.ensure_active()?;
        let event = self.transport.forward(&mut self.session, &mut self.element)?;
        self.sync.publish(&self.session, event);
        Ok(event)
    }

    /// Handle a native `timeupdate` notification.
    ///
    /// # Errors
    ///
    /// `SessionEnded` after `end`.
    pub fn on_time_update(&mut self) -> Result<Tick, PartyError> {
        self.ensure_active()?;
        Ok(self.clock.on_time_update(&mut self.session, &self.element))
    }

    // -------------------------------------------------------------------------
    // Chat and gallery
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// `SessionEnded` after `end`, `Chat(EmptyInput)` for blank text.
    pub fn send_message(&mut self, text: &str) -> Result<Message, PartyError> {
        self.ensure_active()?;
        let message = self.chat.send(&self.author, text)?.clone();
        self.sync.publish_frame(&self.session, message.to_frame());
        Ok(message)
    }

    /// # Errors
    ///
    /// `SessionEnded` after `end`, `Chat(UnknownId)` or `Chat(NotAuthor)`.
    pub fn unsend_message(&mut self, id: u64) -> Result<(), PartyError> {
        self.ensure_active()?;
        self.chat.unsend(id, &self.author)?;
        self.sync.publish_frame(&self.session, unsend_frame(id));
        Ok(())
    }

    /// # Errors
    ///
    /// `SessionEnded` after `end`, `NoFileSelected` when `file` is `None`.
    pub fn upload(&mut self, file: Option<FileHandle>) -> Result<MediaItem, PartyError> {
        self.ensure_active()?;
        let file = file.ok_or(PartyError::NoFileSelected)?;
        let item = self.gallery.upload(&self.author, file).clone();
        info!(
            session_id = %self.session.id,
            media_id = item.id,
            kind = item.kind.as_str(),
            file_name = %item.file_name,
            "media uploaded"
        );
        self.sync.publish_frame(&self.session, item.to_frame());
        Ok(item)
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Apply a frame published by the session leader. Chat and gallery
    /// records are stored under the leader's ids.
    ///
    /// # Errors
    ///
    /// `SessionEnded` after `end`, any `SyncError`, or `Chat(UnknownId)`
    /// for an unsend of a message this replica never received.
    pub fn handle_frame(&mut self, frame: &Frame) -> Result<Applied, PartyError> {
        self.ensure_active()?;
        let applied = self.sync.apply_remote(&mut self.session, &mut self.element, frame)?;
        match &applied {
            Applied::MessageSent(message) => {
                self.chat.record(message.clone());
            }
            Applied::MessageUnsent(id) => {
                self.chat.hide(*id)?;
            }
            Applied::Uploaded(item) => {
                self.gallery.record(item.clone());
            }
            Applied::Transport(_) | Applied::Snapshot(_) => {}
        }
        Ok(applied)
    }

    /// Route a UI event to the matching operation.
    ///
    /// # Errors
    ///
    /// Whatever the routed operation returns.
    pub fn dispatch(&mut self, event: UiEvent) -> Result<Outcome, PartyError> {
        match event {
            UiEvent::TogglePlayPause => self.toggle_play_pause().map(Outcome::Transport),
            UiEvent::Seek(target) => self.seek(target).map(Outcome::Transport),
            UiEvent::Rewind => self.rewind().map(Outcome::Transport),
            UiEvent::Forward => self.forward().map(Outcome::Transport),
            UiEvent::TimeUpdate => self.on_time_update().map(Outcome::Tick),
            UiEvent::SendMessage(text) => self.send_message(&text).map(Outcome::MessageSent),
            UiEvent::UnsendMessage(id) => self.unsend_message(id).map(|()| Outcome::MessageUnsent(id)),
            UiEvent::Upload(file) => self.upload(file).map(Outcome::Uploaded),
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Tear the session down. Returns `false` if it had already ended.
    ///
    /// A leader that was playing publishes a final pause so followers stop
    /// with it.
    pub fn end(&mut self) -> bool {
        let was_playing = self.session.is_playing;
        if !self.session.end() {
            return false;
        }
        if !self.element.is_paused() {
            self.element.pause();
        }
        if was_playing && self.session.is_leader() {
            self.sync.publish(&self.session, TransportEvent::PlayState { is_playing: false });
        }
        info!(
            session_id = %self.session.id,
            participant_id = %self.session.participant_id,
            messages = self.chat.len(),
            media = self.gallery.len(),
            "left watch party"
        );
        true
    }

    fn ensure_active(&self) -> Result<(), PartyError> {
        if self.session.is_ended() {
            return Err(PartyError::SessionEnded(self.session.id));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "party_test.rs"]
mod tests;
