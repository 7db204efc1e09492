//! Outbound event vocabulary and payload builders.
//!
//! Every payload that leaves here has authoritative fields stripped:
//! questions go out as [`qz_content::QuestionView`], and the correct
//! option id appears only in feedback and reveal events that fire after
//! the question is settled.
use qz_content::Question;
use qz_core::ID;
use qz_core::Score;
use qz_live::LiveState;
use qz_store::Enrolled;
use qz_store::Participant;
use qz_store::Session;
use serde_json::Value;
use serde_json::json;

pub const MATCH_FOUND: &str = "match:found";
pub const FF_MATCH_FOUND: &str = "ff:match_found";
pub const QUESTION_NEW: &str = "question:new";
pub const SCORE_UPDATE: &str = "score:update";
pub const FF_NEW_QUESTION: &str = "ff:new_question";
pub const FF_PLAYER_ANSWERED: &str = "ff:player_answered";
pub const FF_POINT_AWARDED: &str = "ff:point_awarded";
pub const FF_QUESTION_TIMEOUT: &str = "ff:question_timeout";
pub const FF_GAME_END: &str = "ff:game_end";
pub const ANSWER_FEEDBACK: &str = "answer:feedback";
pub const PRACTICE_STARTED: &str = "practice:started";
pub const PRACTICE_FINISHED: &str = "practice:finished";
pub const PRACTICE_ERROR: &str = "practice:error";
pub const TIME_ATTACK_STARTED: &str = "time_attack:started";
pub const TIME_ATTACK_SCORE_UPDATE: &str = "time_attack:score_update";
pub const TIME_ATTACK_FINISHED: &str = "time_attack:finished";
pub const TIME_ATTACK_ERROR: &str = "time_attack:error";
pub const GROUP_STARTED: &str = "group_game:started";
pub const GROUP_SCORE_UPDATE: &str = "group_game:score_update";
pub const GROUP_FINISHED: &str = "group_game:finished";
pub const PARTICIPANT_FINISHED: &str = "participant:finished";
pub const GAME_END: &str = "game:end";
pub const GAME_ERROR: &str = "game:error";

/// Roster as clients see it.
pub fn roster_summary(roster: &[Enrolled]) -> Value {
    Value::Array(
        roster
            .iter()
            .map(|e| {
                json!({
                    "participantId": e.participant,
                    "userId": e.user,
                    "username": e.username,
                    "isBot": e.is_bot,
                    "rating": e.rating,
                })
            })
            .collect(),
    )
}

/// A question delivery: stripped view plus its 1-based number.
pub fn question_payload(question: &Question, number: usize) -> Value {
    json!({ "question": question.view(), "questionNumber": number })
}

/// The whole score map, keyed by participant id.
pub fn scores_payload(state: &LiveState) -> Value {
    json!({ "scores": state.scores })
}

/// Terminal `{scores, results}` payload shared by the map-carrying modes.
pub fn end_payload(session: ID<Session>, state: &LiveState) -> Value {
    json!({
        "sessionId": session,
        "scores": state.scores,
        "results": state.results,
    })
}

/// Terminal practice payload: the lone participant's results array.
pub fn practice_end_payload(
    session: ID<Session>,
    state: &LiveState,
    participant: ID<Participant>,
) -> Value {
    json!({
        "sessionId": session,
        "score": state.scores.get(&participant).copied().unwrap_or(0),
        "results": state.results.get(&participant).cloned().unwrap_or_default(),
    })
}

/// Targeted error surfaced to an affected participant.
pub fn error_payload(reason: &str) -> Value {
    json!({ "reason": reason })
}

/// Single-score update for solo modes.
pub fn solo_score_payload(score: Score) -> Value {
    json!({ "score": score })
}
