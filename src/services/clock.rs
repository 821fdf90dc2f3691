//! Clock service — republishes the element's native position.
//!
//! DESIGN
//! ======
//! Observation is one-directional: every native `timeupdate` tick copies
//! `element.current_time()` into `Session::current_time`. This is the only
//! writer of the session position besides an explicit seek, and the element
//! is the source of truth, so a seek's value is expected to be replaced by
//! the first tick after playback resumes.
//!
//! Ticks that arrive while the element is still seeking are skipped. The
//! element would report a position the seek has not settled on yet, and
//! copying it would overwrite the seek target.

use tracing::debug;

use crate::element::MediaElement;
use crate::state::Session;

/// Result of one `timeupdate` notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    Observed(f64),
    SkippedWhileSeeking,
}

#[derive(Debug, Default)]
pub struct TimeTracker {
    observed: u64,
    skipped: u64,
}

impl TimeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a native `timeupdate` notification.
    pub fn on_time_update<E>(&mut self, session: &mut Session, element: &E) -> Tick
    where
        E: MediaElement + ?Sized,
    {
        if element.seeking() {
            self.skipped += 1;
            debug!(session_id = %session.id, "timeupdate skipped while seeking");
            return Tick::SkippedWhileSeeking;
        }

        let position = element.current_time();
        if session.is_playing && position < session.current_time {
            debug!(
                session_id = %session.id,
                previous = session.current_time,
                position,
                "playback position moved backwards without a seek"
            );
        }

        session.current_time = position;
        self.observed += 1;
        Tick::Observed(position)
    }

    /// Ticks copied into the session so far.
    #[must_use]
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// Ticks dropped because a seek was in flight.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[cfg(test)]
#[path = "clock_test.rs"]
mod tests;
