//! cinesync — leader-driven synchronized playback for a watch party.
//!
//! ARCHITECTURE
//! ============
//! One participant leads a session and is the only one allowed to play,
//! pause or seek. Every other participant follows: their element is brought
//! to the leader's position on join and kept there by applying the frames
//! the leader publishes. Chat and the media gallery ride alongside as
//! independent append-only stores.
//!
//! Nothing here talks to a network. Followers attach through in-process
//! channels that mark where a real transport would plug in.

pub mod config;
pub mod console;
pub mod element;
pub mod frame;
pub mod party;
pub mod services;
pub mod state;
