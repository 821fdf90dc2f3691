//! Transport service — leader-only play/pause and seek.
//!
//! DESIGN
//! ======
//! Every operation checks the session role first. A follower call returns
//! `PermissionDenied` and touches neither the session nor the element.
//! Successful calls mutate the element, then the session, and return the
//! authoritative `TransportEvent` the coordinator fans out to followers.
//!
//! Out-of-range seek targets are handled by the configured `SeekPolicy`.
//! Under `PassThrough` the target reaches the element untouched and the
//! element applies its own clamping; the session still records the
//! requested value until the next clock tick replaces it.

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{SeekPolicy, SessionConfig};
use crate::element::MediaElement;
use crate::frame::ErrorCode;
use crate::state::Session;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransportError {
    #[error("participant {0} is not the session leader")]
    PermissionDenied(Uuid),
    #[error("seek target {target}s is outside [0, {duration}]")]
    OutOfRange { target: f64, duration: f64 },
    #[error("seek target is not a finite number")]
    InvalidTime,
}

impl ErrorCode for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "E_PERMISSION_DENIED",
            Self::OutOfRange { .. } => "E_SEEK_OUT_OF_RANGE",
            Self::InvalidTime => "E_INVALID_TIME",
        }
    }
}

/// An authoritative playback change made by the leader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportEvent {
    PlayState { is_playing: bool },
    Seek { current_time: f64 },
}

// =============================================================================
// CONTROLLER
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct TransportController {
    seek_step: f64,
    policy: SeekPolicy,
}

impl TransportController {
    #[must_use]
    pub fn new(seek_step: f64, policy: SeekPolicy) -> Self {
        Self { seek_step, policy }
    }

    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.seek_step_secs, config.seek_policy)
    }

    #[must_use]
    pub fn seek_step(&self) -> f64 {
        self.seek_step
    }

    #[must_use]
    pub fn policy(&self) -> SeekPolicy {
        self.policy
    }

    /// Flip between playing and paused, commanding the element to match.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if the local participant is not leader.
    pub fn toggle_play_pause<E>(&self, session: &mut Session, element: &mut E) -> Result<TransportEvent, TransportError>
    where
        E: MediaElement + ?Sized,
    {
        authorize(session)?;

        session.is_playing = !session.is_playing;
        if session.is_playing {
            element.play();
            info!(session_id = %session.id, current_time = session.current_time, "leader played the video");
        } else {
            element.pause();
            info!(session_id = %session.id, current_time = session.current_time, "leader paused the video");
        }

        Ok(TransportEvent::PlayState { is_playing: session.is_playing })
    }

    /// Move playback to `target` seconds.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for followers, `InvalidTime` for NaN or
    /// infinite targets, and `OutOfRange` under `SeekPolicy::Reject`.
    pub fn seek<E>(&self, session: &mut Session, element: &mut E, target: f64) -> Result<TransportEvent, TransportError>
    where
        E: MediaElement + ?Sized,
    {
        authorize(session)?;
        if !target.is_finite() {
            return Err(TransportError::InvalidTime);
        }

        let resolved = resolve_target(self.policy, target, element.duration())?;
        element.set_current_time(resolved);
        session.current_time = resolved;

        info!(session_id = %session.id, requested = target, current_time = resolved, "leader seeked");
        Ok(TransportEvent::Seek { current_time: resolved })
    }

    /// Seek back by the configured step.
    ///
    /// # Errors
    ///
    /// Same as [`TransportController::seek`].
    pub fn rewind<E>(&self, session: &mut Session, element: &mut E) -> Result<TransportEvent, TransportError>
    where
        E: MediaElement + ?Sized,
    {
        let target = session.current_time - self.seek_step;
        self.seek(session, element, target)
    }

    /// Seek forward by the configured step.
    ///
    /// # Errors
    ///
    /// Same as [`TransportController::seek`].
    pub fn forward<E>(&self, session: &mut Session, element: &mut E) -> Result<TransportEvent, TransportError>
    where
        E: MediaElement + ?Sized,
    {
        let target = session.current_time + self.seek_step;
        self.seek(session, element, target)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn authorize(session: &Session) -> Result<(), TransportError> {
    if session.is_leader() {
        return Ok(());
    }
    debug!(session_id = %session.id, participant_id = %session.participant_id, "transport command from follower refused");
    Err(TransportError::PermissionDenied(session.participant_id))
}

fn resolve_target(policy: SeekPolicy, target: f64, duration: Option<f64>) -> Result<f64, TransportError> {
    match policy {
        SeekPolicy::PassThrough => Ok(target),
        SeekPolicy::Clamp => {
            let floored = target.max(0.0);
            Ok(duration.map_or(floored, |d| floored.min(d)))
        }
        SeekPolicy::Reject => {
            let upper = duration.unwrap_or(f64::INFINITY);
            if target < 0.0 || target > upper {
                return Err(TransportError::OutOfRange { target, duration: upper });
            }
            Ok(target)
        }
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
