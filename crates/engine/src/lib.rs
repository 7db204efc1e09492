//! Async runtime for live quiz games.
//!
//! One actor per ACTIVE session owns the authoritative [`qz_live::LiveState`]
//! and is its only writer; client answers, bot answers, and durable timer
//! firings all converge on its mailbox. Game semantics live in pure
//! per-mode [`Rules`] that mutate state and return [`Effect`]s; the actor
//! is the imperative shell that performs the I/O those effects describe.
//!
//! ## Architecture
//!
//! - [`Engine`] — Session registry, start surface, and event entry points
//! - [`SessionActor`] — Single-writer task owning one session's state
//! - [`Rules`] — Per-mode capability set (start/answer/skip/timeout/end)
//! - [`Effect`] — What a rules decision asks the shell to do
//!
//! ## Events
//!
//! - [`protocol`] — Outbound event names and payload builders
mod actor;
mod context;
mod effect;
mod engine;
pub mod protocol;
mod rules;

pub use actor::*;
pub use context::*;
pub use effect::*;
pub use engine::*;
pub use rules::*;
