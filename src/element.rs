//! Media element boundary.
//!
//! DESIGN
//! ======
//! `MediaElement` is the slice of a native playback element the sync core
//! consumes: play/pause commands, a settable position, and a `seeking` flag.
//! The core never reimplements playback; it only drives and observes it.
//!
//! `SimulatedElement` stands in for the native element in the binary and in
//! tests. It follows native semantics where the core depends on them:
//! positions are clamped into `[0, duration]`, a position assignment leaves
//! the element `seeking` until the seek completes, and time only advances
//! while unpaused.

/// The native playback capability the core drives.
pub trait MediaElement {
    fn play(&mut self);
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;
    /// Request a new playback position. The element may clamp it.
    fn set_current_time(&mut self, seconds: f64);
    /// Content duration, if known.
    fn duration(&self) -> Option<f64>;
    /// True while a position change is still being applied.
    fn seeking(&self) -> bool;
}

// =============================================================================
// SIMULATED ELEMENT
// =============================================================================

/// A command the simulated element received, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementCommand {
    Play,
    Pause,
    /// The requested position, before clamping.
    SetCurrentTime(f64),
}

#[derive(Debug, Clone)]
pub struct SimulatedElement {
    src: String,
    duration: f64,
    position: f64,
    paused: bool,
    seeking: bool,
    commands: Vec<ElementCommand>,
}

impl SimulatedElement {
    #[must_use]
    pub fn new(src: impl Into<String>, duration: f64) -> Self {
        Self {
            src: src.into(),
            duration: duration.max(0.0),
            position: 0.0,
            paused: true,
            seeking: false,
            commands: Vec::new(),
        }
    }

    #[must_use]
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Advance playback by `dt` seconds and return the position a native
    /// `timeupdate` notification would carry.
    ///
    /// A pending seek completes first. Paused elements do not move.
    pub fn advance(&mut self, dt: f64) -> f64 {
        self.seeking = false;
        if !self.paused && dt.is_finite() && dt > 0.0 {
            self.position = (self.position + dt).min(self.duration);
        }
        self.position
    }

    /// Finish an in-flight seek without advancing time.
    pub fn complete_seek(&mut self) {
        self.seeking = false;
    }

    #[must_use]
    pub fn commands(&self) -> &[ElementCommand] {
        &self.commands
    }

    /// Drain the recorded commands.
    pub fn take_commands(&mut self) -> Vec<ElementCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl MediaElement for SimulatedElement {
    fn play(&mut self) {
        self.commands.push(ElementCommand::Play);
        self.paused = false;
    }

    fn pause(&mut self) {
        self.commands.push(ElementCommand::Pause);
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.commands.push(ElementCommand::SetCurrentTime(seconds));
        // Native elements ignore NaN assignments.
        if seconds.is_nan() {
            return;
        }
        self.position = seconds.clamp(0.0, self.duration);
        self.seeking = true;
    }

    fn duration(&self) -> Option<f64> {
        Some(self.duration)
    }

    fn seeking(&self) -> bool {
        self.seeking
    }
}

#[cfg(test)]
#[path = "element_test.rs"]
mod tests;
