//! Domain services driven by a watch party.
//!
//! ARCHITECTURE
//! ============
//! Playback services (`role`, `transport`, `clock`, `sync`, `broadcast`)
//! operate on a borrowed `Session` and media element. `chat` and `media`
//! own their stores outright and never touch playback.

pub mod broadcast;
pub mod chat;
pub mod clock;
pub mod media;
pub mod role;
pub mod sync;
pub mod transport;
