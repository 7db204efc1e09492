use super::*;
use qz_core::ID;
use qz_store::Participant;
use qz_store::Session;
use qz_store::UserProfile;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Who an envelope addresses. The gateway resolves `user` and
/// `participant` ids through its socket bindings and `room` through its
/// room memberships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    User,
    Participant,
    Room,
}

/// One outbound publish: a named event fanned out to a target set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub target: Target,
    pub ids: Vec<String>,
    pub event: String,
    pub payload: Value,
}

impl Envelope {
    pub fn new(target: Target, ids: Vec<String>, event: &str, payload: Value) -> Self {
        Self {
            target,
            ids,
            event: event.to_string(),
            payload,
        }
    }
}

/// Fan-out primitives for game events.
/// Publishing is fire-and-forget from the engine's point of view: a bus
/// failure is logged, never propagated into game state handling, and
/// per-socket buffering for slow clients is the gateway's problem.
#[derive(Clone)]
pub struct EventBus {
    redis: ConnectionManager,
}

impl EventBus {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn emit_to_users(&self, users: &[ID<UserProfile>], event: &str, payload: Value) {
        let ids = users.iter().map(|id| id.to_string()).collect();
        self.publish(Envelope::new(Target::User, ids, event, payload))
            .await;
    }

    pub async fn emit_to_participants(
        &self,
        participants: &[ID<Participant>],
        event: &str,
        payload: Value,
    ) {
        let ids = participants.iter().map(|id| id.to_string()).collect();
        self.publish(Envelope::new(Target::Participant, ids, event, payload))
            .await;
    }

    pub async fn emit_to_room(&self, session: ID<Session>, event: &str, payload: Value) {
        self.publish(Envelope::new(
            Target::Room,
            vec![session.to_string()],
            event,
            payload,
        ))
        .await;
    }

    async fn publish(&self, envelope: Envelope) {
        let mut conn = self.redis.clone();
        let blob = serde_json::to_string(&envelope).expect("envelope serializes");
        log::debug!("[bus] {} -> {:?} {:?}", envelope.event, envelope.target, envelope.ids);
        if let Err(e) = conn.publish::<_, _, ()>(OUTBOUND_CHANNEL, blob).await {
            log::error!("[bus] publish of {} failed: {}", envelope.event, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn envelope_wire_shape() {
        let envelope = Envelope::new(
            Target::Room,
            vec!["abc".into()],
            "score:update",
            serde_json::json!({ "scores": {} }),
        );
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"target\":\"room\""));
        assert!(json.contains("\"ids\":[\"abc\"]"));
        assert!(json.contains("\"event\":\"score:update\""));
        assert!(json.contains("\"payload\""));
    }
}
