//! Broadcast service — in-process fan-out of session frames.
//!
//! DESIGN
//! ======
//! Each attached participant is represented by the sending half of a
//! bounded mpsc channel. Delivery is best-effort: a full queue drops the
//! frame for that participant with a warning instead of blocking the
//! publisher, and closed queues are skipped until pruned.
//!
//! This is the seam where a real network transport would sit. Nothing here
//! leaves the process.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::frame::Frame;

#[derive(Debug, Default)]
pub struct Fanout {
    /// Attached participants: `participant_id` -> sender for outgoing frames.
    clients: HashMap<Uuid, mpsc::Sender<Frame>>,
}

impl Fanout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a participant. Replaces any previous sender for the same id.
    pub fn join(&mut self, participant_id: Uuid, tx: mpsc::Sender<Frame>) {
        self.clients.insert(participant_id, tx);
    }

    /// Detach a participant. Returns `false` if it was not attached.
    pub fn part(&mut self, participant_id: Uuid) -> bool {
        self.clients.remove(&participant_id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    #[must_use]
    pub fn contains(&self, participant_id: Uuid) -> bool {
        self.clients.contains_key(&participant_id)
    }

    /// Send `frame` to every attached participant except `exclude`.
    /// Returns how many queues accepted it.
    pub fn broadcast(&self, frame: &Frame, exclude: Option<Uuid>) -> usize {
        let mut delivered = 0;
        for (participant_id, tx) in &self.clients {
            if exclude == Some(*participant_id) {
                continue;
            }
            if deliver(*participant_id, tx, frame) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Send `frame` to one participant. Returns `false` if it was not
    /// attached or its queue refused the frame.
    pub fn send_to(&self, participant_id: Uuid, frame: &Frame) -> bool {
        let Some(tx) = self.clients.get(&participant_id) else {
            return false;
        };
        deliver(participant_id, tx, frame)
    }

    /// Drop participants whose receiving side has gone away.
    /// Returns how many were removed.
    pub fn prune_closed(&mut self) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, tx| !tx.is_closed());
        before - self.clients.len()
    }
}

fn deliver(participant_id: Uuid, tx: &mpsc::Sender<Frame>, frame: &Frame) -> bool {
    match tx.try_send(frame.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(%participant_id, syscall = %frame.syscall, "participant queue full; frame dropped");
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!(%participant_id, syscall = %frame.syscall, "participant queue closed");
            false
        }
    }
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
