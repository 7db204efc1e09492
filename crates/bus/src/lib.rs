//! Event bus between the orchestration core and the socket gateway.
//!
//! The gateway tier owns sockets, user/participant bindings, and room
//! memberships; this core only publishes. Each publish is one envelope
//! `{target, ids, event, payload}` on the outbound channel, which the
//! gateway translates into socket sends. Inbound client events arrive on
//! a second channel as tagged [`ClientMessage`]s.
//!
//! - [`EventBus`] — The three fan-out primitives
//! - [`Envelope`] — Outbound wire format
//! - [`ClientMessage`] — Inbound event vocabulary
//! - [`Inbox`] — Subscriber pumping inbound messages to the router
mod envelope;
mod inbound;

pub use envelope::*;
pub use inbound::*;

/// Channel carrying engine → gateway envelopes.
pub const OUTBOUND_CHANNEL: &str = "gateway:outbound";
/// Channel carrying gateway → engine client events.
pub const INBOUND_CHANNEL: &str = "gateway:inbound";
