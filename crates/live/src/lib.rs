//! Ephemeral per-session game state.
//!
//! One [`LiveState`] blob per ACTIVE session, checkpointed to redis by the
//! session's single writer and expired shortly after the whole-game
//! deadline. The store also holds the cancellable FFF timer-job slot and
//! the leaderboard cache keys this core invalidates at game end.
//!
//! - [`LiveState`] — Authoritative mutable game state
//! - [`AnswerRecord`], [`QuestionAnswer`] — Per-answer audit records
//! - [`LiveStore`] — Redis checkpoint/read/delete with TTL
mod state;
mod store;

pub use state::*;
pub use store::*;

/// Redis error type alias.
pub type RedisErr = redis::RedisError;

/// Establishes the shared redis connection.
///
/// Connects using the `QZ_REDIS_URL` environment variable and returns a
/// multiplexed connection manager suitable for cloning across tasks.
///
/// # Panics
///
/// Panics if `QZ_REDIS_URL` is not set or the connection fails.
pub async fn redis() -> redis::aio::ConnectionManager {
    log::info!("connecting to redis");
    let ref url = std::env::var("QZ_REDIS_URL").expect("QZ_REDIS_URL must be set");
    let client = redis::Client::open(url.as_str()).expect("redis url invalid");
    client
        .get_connection_manager()
        .await
        .expect("redis connection failed")
}
