//! Per-participant session state.
//!
//! DESIGN
//! ======
//! `Session` is owned by exactly one `WatchParty` and handed by `&mut` to
//! whichever service is mutating it, so there is no ambient shared state.
//! Its lifecycle is explicit: `Session::start` at join, `Session::end` at
//! teardown. Follower replicas hold their own `Session`, kept in step with
//! the leader's by applying broadcast frames.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::frame::now_ms;
use crate::services::role::SessionRole;

// =============================================================================
// PLAYBACK SNAPSHOT
// =============================================================================

/// The playback half of a session, as carried by `session:snapshot` frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub current_time: f64,
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    /// The local participant.
    pub participant_id: Uuid,
    role: SessionRole,
    pub is_playing: bool,
    /// Playback position in seconds. Written by seeks and clock ticks only.
    pub current_time: f64,
    /// Milliseconds since Unix epoch.
    pub started_at: i64,
    ended_at: Option<i64>,
}

impl Session {
    /// Start a paused session at position zero.
    #[must_use]
    pub fn start(id: Uuid, participant_id: Uuid, role: SessionRole) -> Self {
        Self {
            id,
            participant_id,
            role,
            is_playing: false,
            current_time: 0.0,
            started_at: now_ms(),
            ended_at: None,
        }
    }

    #[must_use]
    pub fn role(&self) -> &SessionRole {
        &self.role
    }

    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.role.is_leader()
    }

    #[must_use]
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot { is_playing: self.is_playing, current_time: self.current_time }
    }

    /// Tear the session down. Returns `false` if it had already ended.
    pub fn end(&mut self) -> bool {
        if self.ended_at.is_some() {
            return false;
        }
        self.is_playing = false;
        self.ended_at = Some(now_ms());
        true
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<i64> {
        self.ended_at
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
