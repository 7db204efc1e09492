use qz_core::Unique;
use qz_store::Enrolled;
use qz_store::Session;
use serde_json::Value;
use serde_json::json;

/// The `lobby:update` view: derived from session + roster on demand,
/// never stored.
pub fn projection(session: &Session, roster: &[Enrolled]) -> Value {
    json!({
        "sessionId": session.id(),
        "roomCode": session.room_code(),
        "hostId": session.host(),
        "status": session.status(),
        "tier": session.tier(),
        "durationMinutes": session.duration_minutes(),
        "minPlayers": session.min_players(),
        "maxPlayers": session.max_players(),
        "countdownStartedAt": session.countdown_started_at().map(|t| t.to_rfc3339()),
        "players": roster
            .iter()
            .map(|e| json!({
                "participantId": e.participant,
                "userId": e.user,
                "username": e.username,
                "isBot": e.is_bot,
            }))
            .collect::<Vec<_>>(),
    })
}
