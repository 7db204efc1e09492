//! Durable delayed-job dispatch.
//!
//! Deferred transitions (whole-game deadlines, FFF question timeouts and
//! inter-question gaps, lobby countdowns) must survive process restarts,
//! so they live in redis rather than in tokio timers: a sorted set scored
//! by due time plus a payload hash, per queue. A polling [`Dispatcher`]
//! claims due jobs and hands them to a [`JobHandler`].
//!
//! Delivery is at-least-once; handlers are required to be idempotent and
//! to treat stale jobs as no-ops.
mod dispatch;
mod job;
mod timers;

pub use dispatch::*;
pub use job::*;
pub use timers::*;

/// Job queue error type alias.
pub type JobErr = redis::RedisError;

/// Queue for whole-game deadlines, FFF question timeouts, and FFF
/// inter-question advances.
pub const GAME_TIMERS: &str = "game-timers";
/// Queue for lobby countdown completion.
pub const LOBBY_COUNTDOWN_JOBS: &str = "lobby-countdown-jobs";
