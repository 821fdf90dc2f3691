//! Session configuration parsed from environment variables.
//!
//! Every knob has a typed default so a bare environment yields a working
//! session. Numeric values that fail to parse fall back to their default;
//! an unknown seek policy is an error.

use std::str::FromStr;

use crate::frame::ErrorCode;

pub const DEFAULT_AUTHOR: &str = "User";
pub const DEFAULT_SEEK_STEP_SECS: f64 = 10.0;
pub const DEFAULT_VIDEO_SRC: &str = "https://www.w3schools.com/html/mov_bbb.mp4";
pub const DEFAULT_VIDEO_DURATION_SECS: f64 = 10.0;
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 64;

// =============================================================================
// SEEK POLICY
// =============================================================================

/// What the transport does with a seek target outside `[0, duration]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekPolicy {
    /// Forward the target untouched and let the media element clamp it.
    #[default]
    PassThrough,
    /// Clamp the target into `[0, duration]` before it reaches the element.
    Clamp,
    /// Refuse the seek with `TransportError::OutOfRange`.
    Reject,
}

impl FromStr for SeekPolicy {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "passthrough" | "pass_through" => Ok(Self::PassThrough),
            "clamp" => Ok(Self::Clamp),
            "reject" => Ok(Self::Reject),
            other => Err(ConfigError::Invalid {
                key: "CINESYNC_SEEK_POLICY",
                reason: format!("unknown seek policy '{other}' (expected passthrough, clamp or reject)"),
            }),
        }
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "E_CONFIG",
        }
    }
}

// =============================================================================
// SESSION CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Display name stamped on chat messages and uploads.
    pub author: String,
    /// Seconds moved by rewind/forward.
    pub seek_step_secs: f64,
    pub seek_policy: SeekPolicy,
    /// Source of the shared video.
    pub video_src: String,
    /// Duration reported by the simulated media element.
    pub video_duration_secs: f64,
    /// Bounded capacity of each follower's frame queue.
    pub event_queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            author: DEFAULT_AUTHOR.to_string(),
            seek_step_secs: DEFAULT_SEEK_STEP_SECS,
            seek_policy: SeekPolicy::default(),
            video_src: DEFAULT_VIDEO_SRC.to_string(),
            video_duration_secs: DEFAULT_VIDEO_DURATION_SECS,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Build typed session config from environment variables.
    ///
    /// Optional:
    /// - `CINESYNC_AUTHOR`: default `User`
    /// - `CINESYNC_SEEK_STEP_SECS`: default 10
    /// - `CINESYNC_SEEK_POLICY`: `passthrough` (default), `clamp` or `reject`
    /// - `CINESYNC_VIDEO_SRC`: default Big Buck Bunny sample clip
    /// - `CINESYNC_VIDEO_DURATION_SECS`: default 10
    /// - `CINESYNC_EVENT_QUEUE_CAPACITY`: default 64
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an unknown seek policy.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. `from_env` delegates here.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an unknown seek policy.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let seek_policy = match lookup("CINESYNC_SEEK_POLICY") {
            Some(raw) => raw.parse()?,
            None => SeekPolicy::default(),
        };

        let author = lookup("CINESYNC_AUTHOR")
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        let seek_step_secs = parse_or(&lookup, "CINESYNC_SEEK_STEP_SECS", DEFAULT_SEEK_STEP_SECS);
        let video_duration_secs = parse_or(&lookup, "CINESYNC_VIDEO_DURATION_SECS", DEFAULT_VIDEO_DURATION_SECS);

        Ok(Self {
            author,
            seek_step_secs: positive_or(seek_step_secs, DEFAULT_SEEK_STEP_SECS),
            seek_policy,
            video_src: lookup("CINESYNC_VIDEO_SRC").unwrap_or_else(|| DEFAULT_VIDEO_SRC.to_string()),
            video_duration_secs: positive_or(video_duration_secs, DEFAULT_VIDEO_DURATION_SECS),
            event_queue_capacity: parse_or(&lookup, "CINESYNC_EVENT_QUEUE_CAPACITY", DEFAULT_EVENT_QUEUE_CAPACITY)
                .max(1),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn positive_or(value: f64, default: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { default }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
