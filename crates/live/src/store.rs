use super::*;
use chrono::Utc;
use qz_core::ID;
use qz_core::LIVE_TTL_SLACK_SECS;
use qz_store::Session;
use qz_store::UserProfile;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Redis keyspace for the ephemeral tier.
fn live_key(session: ID<Session>) -> String {
    format!("live:{}", session)
}
fn timer_key(session: ID<Session>) -> String {
    format!("ff_timer_job:{}", session)
}

const LEADERBOARD_GLOBAL: &str = "leaderboard:global";

/// Checkpoint store for [`LiveState`] blobs plus the per-session
/// cancellable timer-job slot and leaderboard cache invalidation.
///
/// Writes are last-writer-wins; safety comes from the engine's
/// single-writer-per-session discipline, not from the store.
#[derive(Clone)]
pub struct LiveStore {
    redis: ConnectionManager,
}

impl LiveStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn get(&self, session: ID<Session>) -> Result<Option<LiveState>, RedisErr> {
        let mut conn = self.redis.clone();
        let blob: Option<String> = conn.get(live_key(session)).await?;
        Ok(blob.and_then(|b| match serde_json::from_str(&b) {
            Ok(state) => Some(state),
            Err(e) => {
                log::error!("[live {}] corrupt checkpoint dropped: {}", session, e);
                None
            }
        }))
    }

    /// Writes the checkpoint with a TTL that outlives the whole-game
    /// deadline by a fixed slack, so abandoned sessions expire on their
    /// own but never mid-game.
    pub async fn set(&self, session: ID<Session>, state: &LiveState) -> Result<(), RedisErr> {
        let mut conn = self.redis.clone();
        let blob = serde_json::to_string(state).expect("live state serializes");
        let remaining = (state.end_time - Utc::now()).num_seconds().max(0) as u64;
        conn.set_ex(live_key(session), blob, remaining + LIVE_TTL_SLACK_SECS)
            .await
    }

    pub async fn delete(&self, session: ID<Session>) -> Result<(), RedisErr> {
        let mut conn = self.redis.clone();
        conn.del(vec![live_key(session), timer_key(session)]).await
    }

    /// Remembers the currently scheduled FFF question-timeout job so a
    /// first correct answer can cancel it.
    pub async fn set_timer_job(&self, session: ID<Session>, job: &str) -> Result<(), RedisErr> {
        let mut conn = self.redis.clone();
        conn.set_ex(timer_key(session), job, 24 * 60 * 60).await
    }

    /// Atomically takes the pending timer-job id, leaving the slot empty.
    pub async fn take_timer_job(&self, session: ID<Session>) -> Result<Option<String>, RedisErr> {
        let mut conn = self.redis.clone();
        conn.get_del(timer_key(session)).await
    }

    /// Drops the global and per-user leaderboard projections after a
    /// rating change; they rebuild lazily outside the core.
    pub async fn invalidate_leaderboards(
        &self,
        users: &[ID<UserProfile>],
    ) -> Result<(), RedisErr> {
        let mut conn = self.redis.clone();
        let mut keys = vec![LEADERBOARD_GLOBAL.to_string()];
        keys.extend(users.iter().map(|u| format!("leaderboard:user:{}", u)));
        log::debug!("[live] invalidating {} leaderboard keys", keys.len());
        conn.del(keys).await
    }
}
