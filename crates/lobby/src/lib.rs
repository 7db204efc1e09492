//! Pre-game lobby for GROUP_PLAY.
//!
//! A lobby is a code-addressed GROUP_PLAY session in LOBBY or
//! READY_COUNTDOWN. The controller owns every transition up to the
//! engine hand-off: create, join, leave, host countdown, dissolution.
//! The countdown itself is a durable timer job, so an in-flight start
//! survives a worker restart.
//!
//! - [`LobbyController`] — The state machine
//! - [`Backend`] — The I/O surface it drives; [`PlatformBackend`] wires
//!   the real store, job queue, bus, and engine
//! - [`LobbyError`] — Typed rejections for the HTTP and socket surfaces
//! - [`projection`] — The `lobby:update` view over session + roster
mod backend;
mod code;
mod controller;
mod error;
mod projection;

pub use backend::*;
pub use code::*;
pub use controller::*;
pub use error::*;
pub use projection::*;

pub const LOBBY_UPDATE: &str = "lobby:update";
pub const LOBBY_COUNTDOWN_STARTED: &str = "lobby:countdown_started";
pub const LOBBY_COUNTDOWN_CANCELLED: &str = "lobby:countdown_cancelled";
pub const LOBBY_DISSOLVED: &str = "lobby:dissolved";
