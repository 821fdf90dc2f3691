//! Session roles and the leadership capability.
//!
//! ARCHITECTURE
//! ============
//! A participant is either the leader of a session or a follower of it.
//! Leadership is not a boolean: it is a `LeaderToken` issued by the
//! session's `Leadership` registry, which hands out at most one token per
//! session. A second claim is rejected, so two leaders can never both hold
//! a valid capability for the same session.
//!
//! Role assignment is fixed for the session lifetime; there is no transfer.

use rand::Rng;
use uuid::Uuid;

use crate::frame::ErrorCode;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("session {session_id} already has leader {leader_id}")]
    LeaderAlreadyAssigned { session_id: Uuid, leader_id: Uuid },
    #[error("session {0} has no leader yet")]
    NoLeader(Uuid),
    #[error("role is for session {got}, registry is for {expected}")]
    WrongSession { got: Uuid, expected: Uuid },
    #[error("leader token for {participant_id} was not issued by this registry")]
    UnrecognizedToken { participant_id: Uuid },
    #[error("{claimed} does not lead session {session_id}")]
    NotTheLeader { session_id: Uuid, claimed: Uuid },
}

impl ErrorCode for RoleError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::LeaderAlreadyAssigned { .. } => "E_LEADER_ASSIGNED",
            Self::NoLeader(_) => "E_NO_LEADER",
            Self::WrongSession { .. } => "E_ROLE_WRONG_SESSION",
            Self::UnrecognizedToken { .. } => "E_INVALID_TOKEN",
            Self::NotTheLeader { .. } => "E_NOT_THE_LEADER",
        }
    }
}

/// Capability proving its holder leads one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderToken {
    session_id: Uuid,
    participant_id: Uuid,
    secret: String,
}

impl LeaderToken {
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    #[must_use]
    pub fn participant_id(&self) -> Uuid {
        self.participant_id
    }
}

/// The local participant's role in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRole {
    Leader(LeaderToken),
    /// Follows the participant with the given id.
    Follower { leader_id: Uuid },
}

impl SessionRole {
    /// Gate for every leader-only transport operation.
    #[must_use]
    pub fn is_leader(&self) -> bool {
        matches!(self, Self::Leader(_))
    }

    /// The participant whose transport commands are authoritative.
    #[must_use]
    pub fn leader_id(&self) -> Uuid {
        match self {
            Self::Leader(token) => token.participant_id,
            Self::Follower { leader_id } => *leader_id,
        }
    }
}

// =============================================================================
// LEADERSHIP REGISTRY
// =============================================================================

/// Issues the single leader capability for a session.
///
/// Stands in for a session-establishment protocol: whoever claims first
/// becomes leader, later participants join as followers.
#[derive(Debug)]
pub struct Leadership {
    session_id: Uuid,
    issued: Option<LeaderToken>,
}

impl Leadership {
    #[must_use]
    pub fn new(session_id: Uuid) -> Self {
        Self { session_id, issued: None }
    }

    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Issue the leader token to `participant_id`.
    ///
    /// # Errors
    ///
    /// Returns `LeaderAlreadyAssigned` if a token was already issued.
    pub fn issue(&mut self, participant_id: Uuid) -> Result<LeaderToken, RoleError> {
        if let Some(existing) = &self.issued {
            return Err(RoleError::LeaderAlreadyAssigned {
                session_id: self.session_id,
                leader_id: existing.participant_id,
            });
        }

        let token = LeaderToken { session_id: self.session_id, participant_id, secret: generate_secret() };
        self.issued = Some(token.clone());
        Ok(token)
    }

    /// Check that `token` is the capability this registry issued.
    #[must_use]
    pub fn verify(&self, token: &LeaderToken) -> bool {
        self.issued.as_ref() == Some(token)
    }

    #[must_use]
    pub fn leader_id(&self) -> Option<Uuid> {
        self.issued.as_ref().map(|t| t.participant_id)
    }

    /// Check a role presented for `session_id` against this registry.
    ///
    /// A leader role must carry the token issued here; a follower role must
    /// follow the participant who holds it.
    ///
    /// # Errors
    ///
    /// `WrongSession` for another session's role, `UnrecognizedToken` for a
    /// leader token issued elsewhere, `NoLeader` or `NotTheLeader` for a
    /// follower pointing at anyone but the issued leader.
    pub fn admit(&self, session_id: Uuid, role: &SessionRole) -> Result<(), RoleError> {
        if session_id != self.session_id {
            return Err(RoleError::WrongSession { got: session_id, expected: self.session_id });
        }
        match role {
            SessionRole::Leader(token) if self.verify(token) => Ok(()),
            SessionRole::Leader(token) => Err(RoleError::UnrecognizedToken { participant_id: token.participant_id }),
            SessionRole::Follower { leader_id } => match self.leader_id() {
                None => Err(RoleError::NoLeader(self.session_id)),
                Some(actual) if actual == *leader_id => Ok(()),
                Some(_) => Err(RoleError::NotTheLeader { session_id: self.session_id, claimed: *leader_id }),
            },
        }
    }

    /// Role for a participant joining after the leader.
    ///
    /// # Errors
    ///
    /// Returns `NoLeader` if no token has been issued yet.
    pub fn follower_role(&self) -> Result<SessionRole, RoleError> {
        let leader_id = self.leader_id().ok_or(RoleError::NoLeader(self.session_id))?;
        Ok(SessionRole::Follower { leader_id })
    }
}

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generate a random 32-byte hex secret.
fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

#[cfg(test)]
#[path = "role_test.rs"]
mod tests;
