use super::*;
use chrono::Utc;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use std::time::Duration;

fn due_key(queue: &str) -> String {
    format!("jobs:{}:due", queue)
}
fn payload_key(queue: &str) -> String {
    format!("jobs:{}:payloads", queue)
}

/// Scheduling half of the timer service.
/// A job is a (queue, id, payload, due-time) tuple held in redis until a
/// dispatcher claims it, so pending work survives worker restarts.
#[derive(Clone)]
pub struct Timers {
    redis: ConnectionManager,
}

impl Timers {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Schedules `payload` for delivery after `delay`.
    /// Enqueueing a job id that is already pending is a no-op, which makes
    /// retried schedule calls harmless.
    pub async fn schedule<P: Serialize>(
        &self,
        queue: &str,
        job_id: &str,
        payload: &P,
        delay: Duration,
    ) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.clone();
        let blob = serde_json::to_string(payload).expect("job payload serializes");
        let fresh: bool = conn.hset_nx(payload_key(queue), job_id, blob).await?;
        if !fresh {
            log::debug!("[timers] duplicate enqueue of {} ignored", job_id);
            return Ok(());
        }
        let due = Utc::now().timestamp_millis() + delay.as_millis() as i64;
        let _: () = conn.zadd(due_key(queue), job_id, due).await?;
        log::debug!("[timers] {} due in {:?} on {}", job_id, delay, queue);
        Ok(())
    }

    /// Removes a pending job. Removing an already-fired or unknown id is
    /// a no-op.
    pub async fn cancel(&self, queue: &str, job_id: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.clone();
        let _: () = conn.zrem(due_key(queue), job_id).await?;
        let _: () = conn.hdel(payload_key(queue), job_id).await?;
        log::debug!("[timers] cancelled {} on {}", job_id, queue);
        Ok(())
    }

    /// Claims up to `limit` due jobs, returning their payload blobs.
    /// A ZREM race between competing dispatchers decides ownership, so a
    /// job is delivered by exactly one claimant per firing.
    pub(crate) async fn claim_due(
        &self,
        queue: &str,
        limit: usize,
    ) -> Result<Vec<String>, redis::RedisError> {
        let mut conn = self.redis.clone();
        let now = Utc::now().timestamp_millis();
        let due: Vec<String> = conn
            .zrangebyscore_limit(due_key(queue), i64::MIN, now, 0, limit as isize)
            .await?;
        let mut claimed = Vec::new();
        for job_id in due {
            let won: i64 = conn.zrem(due_key(queue), &job_id).await?;
            if won == 0 {
                continue;
            }
            let payload: Option<String> = conn.hget(payload_key(queue), &job_id).await?;
            let _: () = conn.hdel(payload_key(queue), &job_id).await?;
            match payload {
                Some(blob) => claimed.push(blob),
                None => log::warn!("[timers] {} claimed with no payload", job_id),
            }
        }
        Ok(claimed)
    }
}
