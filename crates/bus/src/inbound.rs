use super::*;
use futures::StreamExt;
use qz_content::Choice;
use qz_content::Question;
use qz_core::ID;
use qz_store::Participant;
use qz_store::Session;
use qz_store::UserProfile;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Client events the gateway routes into the core.
/// The gateway enriches lobby events with the acting `user_id` from its
/// socket binding before publishing. `game:register-participant` is
/// gateway-local (it binds the socket and joins the room) and is passed
/// through here only so the wire vocabulary is complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "answer:submit", rename_all = "camelCase")]
    AnswerSubmit {
        session_id: ID<Session>,
        participant_id: ID<Participant>,
        question_id: ID<Question>,
        option_id: ID<Choice>,
    },
    #[serde(rename = "question:skip", rename_all = "camelCase")]
    QuestionSkip {
        session_id: ID<Session>,
        participant_id: ID<Participant>,
    },
    #[serde(rename = "practice:next_question", rename_all = "camelCase")]
    PracticeNextQuestion {
        session_id: ID<Session>,
        participant_id: ID<Participant>,
    },
    #[serde(rename = "time_attack:request_next_question", rename_all = "camelCase")]
    TimeAttackNextQuestion {
        session_id: ID<Session>,
        participant_id: ID<Participant>,
    },
    #[serde(rename = "quickduel:request_first_question", rename_all = "camelCase")]
    QuickDuelFirstQuestion {
        session_id: ID<Session>,
        participant_id: ID<Participant>,
    },
    #[serde(rename = "lobby:leave", rename_all = "camelCase")]
    LobbyLeave {
        room_code: String,
        user_id: ID<UserProfile>,
    },
    #[serde(rename = "lobby:initiate_countdown", rename_all = "camelCase")]
    LobbyInitiateCountdown {
        room_code: String,
        user_id: ID<UserProfile>,
    },
    #[serde(rename = "lobby:cancel_countdown", rename_all = "camelCase")]
    LobbyCancelCountdown {
        room_code: String,
        user_id: ID<UserProfile>,
    },
    #[serde(rename = "game:register-participant", rename_all = "camelCase")]
    RegisterParticipant {
        participant_id: ID<Participant>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<ID<Session>>,
    },
}

/// Subscriber pumping inbound client events to the router.
/// Malformed messages are logged and dropped; the pump itself only ends
/// when the subscription dies, which the server treats as fatal.
pub struct Inbox;

impl Inbox {
    pub async fn spawn(
        client: redis::Client,
        tx: UnboundedSender<ClientMessage>,
    ) -> Result<tokio::task::JoinHandle<()>, redis::RedisError> {
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(INBOUND_CHANNEL).await?;
        log::info!("[inbox] subscribed to {}", INBOUND_CHANNEL);
        Ok(tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload = match msg.get_payload::<String>() {
                    Ok(payload) => payload,
                    Err(e) => {
                        log::warn!("[inbox] unreadable message: {}", e);
                        continue;
                    }
                };
                match serde_json::from_str::<ClientMessage>(&payload) {
                    Ok(message) => {
                        if tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(e) => log::warn!("[inbox] dropping malformed event: {}", e),
                }
            }
            log::warn!("[inbox] subscription ended");
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn answer_submit_parses() {
        let json = format!(
            r#"{{"event":"answer:submit","data":{{"sessionId":"{}","participantId":"{}","questionId":"{}","optionId":"{}"}}}}"#,
            ID::<Session>::default(),
            ID::<Participant>::default(),
            ID::<Question>::default(),
            ID::<Choice>::default(),
        );
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(&json).unwrap(),
            ClientMessage::AnswerSubmit { .. }
        ));
    }
    #[test]
    fn lobby_event_parses() {
        let json = format!(
            r#"{{"event":"lobby:initiate_countdown","data":{{"roomCode":"ABCDEFGHIJ","userId":"{}"}}}}"#,
            ID::<UserProfile>::default(),
        );
        match serde_json::from_str::<ClientMessage>(&json).unwrap() {
            ClientMessage::LobbyInitiateCountdown { room_code, .. } => {
                assert_eq!(room_code, "ABCDEFGHIJ")
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }
    #[test]
    fn unknown_event_is_rejected() {
        let json = r#"{"event":"no:such_event","data":{}}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }
}
