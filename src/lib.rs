//! Remote media keys over TCP plus now-playing state records for the remote side.

pub mod cli;
pub mod client;
pub mod command;
pub mod config;
pub mod decode;
pub mod lrc;
pub mod reporter;
pub mod server;
/// Playback sessions as seen by the command and state channels.
///
/// A session is owned by whoever discovered it. This crate only ever holds a
/// [`session::SessionHandle`], a weak reference that may go stale at any moment.
pub mod session;
pub mod sink;
pub mod snapshot;
