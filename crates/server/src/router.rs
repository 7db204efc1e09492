//! Inbound event router.
//!
//! Client events arrive from the gateway over the bus; this loop feeds
//! them into the engine and lobby controller. Game events for unknown
//! sessions drop silently inside the engine; lobby rejections on the
//! socket path are logged because there is no reply channel to the
//! client here.
use qz_bus::ClientMessage;
use qz_engine::Engine;
use qz_lobby::LobbyController;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

pub fn spawn(
    engine: Arc<Engine>,
    lobby: Arc<LobbyController>,
    mut rx: UnboundedReceiver<ClientMessage>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            dispatch(&engine, &lobby, message).await;
        }
        log::warn!("[router] inbound channel closed");
    })
}

async fn dispatch(engine: &Arc<Engine>, lobby: &Arc<LobbyController>, message: ClientMessage) {
    match message {
        ClientMessage::AnswerSubmit {
            session_id,
            participant_id,
            question_id,
            option_id,
        } => {
            engine
                .handle_answer(session_id, participant_id, question_id, option_id)
                .await
        }
        ClientMessage::QuestionSkip {
            session_id,
            participant_id,
        } => engine.handle_skip(session_id, participant_id).await,
        ClientMessage::PracticeNextQuestion {
            session_id,
            participant_id,
        }
        | ClientMessage::TimeAttackNextQuestion {
            session_id,
            participant_id,
        }
        | ClientMessage::QuickDuelFirstQuestion {
            session_id,
            participant_id,
        } => engine.handle_request_next(session_id, participant_id).await,
        ClientMessage::LobbyLeave { room_code, user_id } => {
            if let Err(e) = lobby.leave(user_id, &room_code).await {
                log::info!("[router] lobby leave rejected: {}", e);
            }
        }
        ClientMessage::LobbyInitiateCountdown { room_code, user_id } => {
            if let Err(e) = lobby.initiate_countdown(user_id, &room_code).await {
                log::info!("[router] countdown start rejected: {}", e);
            }
        }
        ClientMessage::LobbyCancelCountdown { room_code, user_id } => {
            if let Err(e) = lobby.cancel_countdown(user_id, &room_code).await {
                log::info!("[router] countdown cancel rejected: {}", e);
            }
        }
        // socket-binding concern handled entirely by the gateway
        ClientMessage::RegisterParticipant { .. } => {}
    }
}
