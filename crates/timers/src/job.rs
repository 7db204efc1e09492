use qz_content::Question;
use qz_core::ID;
use qz_store::Session;
use serde::Deserialize;
use serde::Serialize;

/// Payload on the game-timers queue.
/// `question_id` multiplexes the job kinds: the literal `game-end` ends
/// the whole game, an `advance-{index}` sentinel fires an FFF
/// inter-question gap, and anything else is a question uuid whose
/// shared-clock window timed out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTimer {
    pub session_id: ID<Session>,
    pub question_id: String,
}

/// Decoded kind of a [`GameTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameTimerKind {
    GameEnd,
    Advance(usize),
    QuestionTimeout(ID<Question>),
}

const GAME_END: &str = "game-end";
const ADVANCE: &str = "advance-";

impl GameTimer {
    pub fn game_end(session: ID<Session>) -> Self {
        Self {
            session_id: session,
            question_id: GAME_END.to_string(),
        }
    }
    pub fn advance(session: ID<Session>, index: usize) -> Self {
        Self {
            session_id: session,
            question_id: format!("{}{}", ADVANCE, index),
        }
    }
    pub fn question(session: ID<Session>, question: ID<Question>) -> Self {
        Self {
            session_id: session,
            question_id: question.to_string(),
        }
    }
    /// None for a payload that decodes to no known kind; callers drop it.
    pub fn kind(&self) -> Option<GameTimerKind> {
        if self.question_id == GAME_END {
            Some(GameTimerKind::GameEnd)
        } else if let Some(index) = self.question_id.strip_prefix(ADVANCE) {
            index.parse().ok().map(GameTimerKind::Advance)
        } else {
            self.question_id
                .parse()
                .ok()
                .map(GameTimerKind::QuestionTimeout)
        }
    }
}

/// Payload on the lobby-countdown queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyCountdown {
    pub session_id: ID<Session>,
}

/// Job id for a session's whole-game deadline.
pub fn game_end_job(session: ID<Session>) -> String {
    format!("game-end:{}", session)
}
/// Job id for an FFF question-timeout, unique per question index.
pub fn question_job(session: ID<Session>, index: usize) -> String {
    format!("ff-question:{}:{}", session, index)
}
/// Job id for an FFF inter-question advance.
pub fn advance_job(session: ID<Session>, index: usize) -> String {
    format!("ff-advance:{}:{}", session, index)
}
/// Job id for a lobby countdown.
pub fn lobby_job(session: ID<Session>) -> String {
    format!("lobby-start-{}", session)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn game_end_kind() {
        let job = GameTimer::game_end(ID::default());
        assert_eq!(job.kind(), Some(GameTimerKind::GameEnd));
    }
    #[test]
    fn advance_kind_carries_index() {
        let job = GameTimer::advance(ID::default(), 4);
        assert_eq!(job.kind(), Some(GameTimerKind::Advance(4)));
    }
    #[test]
    fn question_kind_round_trips() {
        let question = ID::<Question>::default();
        let job = GameTimer::question(ID::default(), question);
        assert_eq!(job.kind(), Some(GameTimerKind::QuestionTimeout(question)));
    }
    #[test]
    fn garbage_decodes_to_none() {
        let job = GameTimer {
            session_id: ID::default(),
            question_id: "advance-x".into(),
        };
        assert_eq!(job.kind(), None);
    }
    #[test]
    fn payload_wire_shape() {
        let job = GameTimer::game_end(ID::default());
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"sessionId\""));
        assert!(json.contains("\"questionId\":\"game-end\""));
    }
}
