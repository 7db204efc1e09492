use super::*;
use chrono::DateTime;
use chrono::Utc;
use qz_content::Choice;
use qz_content::Question;
use qz_core::ID;
use qz_core::Millis;
use qz_core::Mode;
use qz_core::Unique;
use qz_live::AnswerAction;
use qz_live::AnswerRecord;
use qz_live::LiveState;
use qz_store::Participant;

mod fastest_finger;
mod group_play;
mod practice;
mod quick_duel;
mod time_attack;

pub use fastest_finger::FastestFinger;
pub use group_play::GroupPlay;
pub use practice::Practice;
pub use quick_duel::QuickDuel;
pub use time_attack::TimeAttack;

/// Per-mode game semantics over the common event vocabulary.
///
/// Implementations are pure over `(Ctx, LiveState)`: they mutate the
/// state they are handed and describe I/O as [`Effect`]s. Inputs that are
/// stale or unexpected (wrong question id, duplicate answer, late timer)
/// return no effects and leave the state untouched, which is what makes
/// at-least-once delivery and client retries safe.
pub trait Rules: Send + Sync {
    /// Session just went ACTIVE.
    fn on_start(&self, ctx: &Ctx, state: &mut LiveState) -> Vec<Effect>;
    /// A participant submitted an answer.
    fn on_answer(
        &self,
        ctx: &Ctx,
        state: &mut LiveState,
        participant: ID<Participant>,
        question: ID<Question>,
        option: ID<Choice>,
    ) -> Vec<Effect>;
    /// A participant skipped their current question.
    fn on_skip(
        &self,
        _ctx: &Ctx,
        _state: &mut LiveState,
        _participant: ID<Participant>,
    ) -> Vec<Effect> {
        Vec::new()
    }
    /// A participant (or the client on their behalf) asked for the
    /// current question to be (re)delivered.
    fn on_request_next(
        &self,
        _ctx: &Ctx,
        _state: &mut LiveState,
        _participant: ID<Participant>,
    ) -> Vec<Effect> {
        Vec::new()
    }
    /// A durable per-question deadline fired.
    fn on_question_timeout(
        &self,
        _ctx: &Ctx,
        _state: &mut LiveState,
        _question: ID<Question>,
    ) -> Vec<Effect> {
        Vec::new()
    }
    /// A durable inter-question gap elapsed.
    fn on_advance(&self, _ctx: &Ctx, _state: &mut LiveState, _index: usize) -> Vec<Effect> {
        Vec::new()
    }
    /// The actor was revived from a checkpoint; re-arm anything that
    /// lived only in the lost process (bot tasks).
    fn on_resume(&self, _ctx: &Ctx, _state: &mut LiveState) -> Vec<Effect> {
        Vec::new()
    }
    /// Terminal emission. Runs after final scores are persisted; must not
    /// mutate anything.
    fn on_game_end(&self, ctx: &Ctx, state: &LiveState) -> Vec<Effect>;
}

/// The only polymorphic surface: mode → rules.
pub fn rules_for(mode: Mode) -> &'static dyn Rules {
    match mode {
        Mode::QuickDuel => &QuickDuel,
        Mode::FastestFingerFirst => &FastestFinger,
        Mode::Practice => &Practice,
        Mode::TimeAttack => &TimeAttack,
        Mode::GroupPlay => &GroupPlay,
    }
}

/// Milliseconds since a question was sent, clamped at zero.
pub(crate) fn elapsed_ms(since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Millis {
    since
        .map(|t| (now - t).num_milliseconds().max(0) as Millis)
        .unwrap_or(0)
}

/// Serves a participant their current question in the per-participant
/// progression modes: humans get a stripped `question:new` and a sent
/// timestamp for latency accounting, bots get a scheduled simulated
/// answer. Returns None when the participant has exhausted the batch.
pub(crate) fn serve_question(
    ctx: &Ctx,
    state: &mut LiveState,
    participant: ID<Participant>,
) -> Option<Vec<Effect>> {
    let question = state.current_question(participant)?.clone();
    let number = state.progress(participant) + 1;
    state.question_sent_at.insert(participant, ctx.now);
    let enrolled = ctx.enrolled(participant)?;
    if enrolled.is_bot {
        let decision = qz_bots::choose_answer(&question, state.mode, enrolled.rating, None);
        Some(vec![Effect::ScheduleBot {
            participant,
            question: question.id(),
            choice: decision.choice,
            delay: decision.delay,
        }])
    } else {
        Some(vec![Effect::to_participant(
            participant,
            protocol::QUESTION_NEW,
            protocol::question_payload(&question, number),
        )])
    }
}

/// Shared answer handling for the per-participant progression modes:
/// record, score, advance, serve the next question. `score_event` is the
/// mode's room broadcast for a scoring answer; exhausting the batch
/// notifies the participant they are done.
pub(crate) fn progression_answer(
    ctx: &Ctx,
    state: &mut LiveState,
    participant: ID<Participant>,
    question: ID<Question>,
    option: ID<Choice>,
    score_event: &'static str,
) -> Vec<Effect> {
    let Some(current) = state.current_question(participant) else {
        return Vec::new();
    };
    // answers for anything but the expected question are retries; drop
    if current.id() != question {
        return Vec::new();
    }
    let correct = current.is_correct(option);
    let sent = state.question_sent_at.remove(&participant);
    state.record(
        participant,
        AnswerRecord {
            question_id: question,
            time_taken: elapsed_ms(sent, ctx.now),
            action: AnswerAction::Answered,
            correct,
        },
    );
    let mut effects = Vec::new();
    if correct {
        state.award(participant, qz_core::POINTS_PER_CORRECT);
        effects.push(Effect::to_room(
            score_event,
            protocol::scores_payload(state),
        ));
    }
    state.advance(participant);
    match serve_question(ctx, state, participant) {
        Some(next) => effects.extend(next),
        None => effects.push(Effect::to_participant(
            participant,
            protocol::PARTICIPANT_FINISHED,
            serde_json::json!({ "participantId": participant }),
        )),
    }
    effects
}

/// Shared skip handling for the per-participant progression modes.
pub(crate) fn progression_skip(
    ctx: &Ctx,
    state: &mut LiveState,
    participant: ID<Participant>,
) -> Vec<Effect> {
    let Some(current) = state.current_question(participant) else {
        return Vec::new();
    };
    let question = current.id();
    let sent = state.question_sent_at.remove(&participant);
    state.record(
        participant,
        AnswerRecord {
            question_id: question,
            time_taken: elapsed_ms(sent, ctx.now),
            action: AnswerAction::Skipped,
            correct: false,
        },
    );
    state.advance(participant);
    match serve_question(ctx, state, participant) {
        Some(next) => next,
        None => vec![Effect::to_participant(
            participant,
            protocol::PARTICIPANT_FINISHED,
            serde_json::json!({ "participantId": participant }),
        )],
    }
}

/// Re-delivers a participant's current question without advancing, for
/// clients that missed the original send. Bots re-arm their simulated
/// answer instead, which is how a revived session gets moving again.
pub(crate) fn redeliver_question(
    ctx: &Ctx,
    state: &mut LiveState,
    participant: ID<Participant>,
) -> Vec<Effect> {
    let Some(question) = state.current_question(participant) else {
        return Vec::new();
    };
    let question = question.clone();
    let number = state.progress(participant) + 1;
    let Some(enrolled) = ctx.enrolled(participant) else {
        return Vec::new();
    };
    if enrolled.is_bot {
        let decision = qz_bots::choose_answer(&question, state.mode, enrolled.rating, None);
        vec![Effect::ScheduleBot {
            participant,
            question: question.id(),
            choice: decision.choice,
            delay: decision.delay,
        }]
    } else {
        if !state.question_sent_at.contains_key(&participant) {
            state.question_sent_at.insert(participant, ctx.now);
        }
        vec![Effect::to_participant(
            participant,
            protocol::QUESTION_NEW,
            protocol::question_payload(&question, number),
        )]
    }
}
