use super::*;

/// Solo sprint against a shared countdown. The pool is fetched large
/// enough that the clock, not the batch, is the practical bound; each
/// correct answer is worth +10 and the next question is served
/// immediately, while explicit requests only re-deliver the current one.
pub struct TimeAttack;

impl TimeAttack {
    fn solo(ctx: &Ctx) -> Option<ID<Participant>> {
        ctx.roster.first().map(|e| e.participant)
    }
}

impl Rules for TimeAttack {
    fn on_start(&self, ctx: &Ctx, state: &mut LiveState) -> Vec<Effect> {
        let Some(participant) = Self::solo(ctx) else {
            return Vec::new();
        };
        vec![Effect::to_participant(
            participant,
            protocol::TIME_ATTACK_STARTED,
            serde_json::json!({
                "sessionId": ctx.session,
                "participantId": participant,
                "endTime": state.end_time.to_rfc3339(),
            }),
        )]
    }

    fn on_request_next(
        &self,
        ctx: &Ctx,
        state: &mut LiveState,
        participant: ID<Participant>,
    ) -> Vec<Effect> {
        if state.past_deadline(ctx.now) {
            return vec![Effect::Finish];
        }
        let Some(question) = state.current_question(participant) else {
            return vec![Effect::Finish];
        };
        let question = question.clone();
        let number = state.progress(participant) + 1;
        if !state.question_sent_at.contains_key(&participant) {
            state.question_sent_at.insert(participant, ctx.now);
        }
        vec![Effect::to_participant(
            participant,
            protocol::QUESTION_NEW,
            protocol::question_payload(&question, number),
        )]
    }

    fn on_answer(
        &self,
        ctx: &Ctx,
        state: &mut LiveState,
        participant: ID<Participant>,
        question: ID<Question>,
        option: ID<Choice>,
    ) -> Vec<Effect> {
        if state.past_deadline(ctx.now) {
            return vec![Effect::Finish];
        }
        let Some(current) = state.current_question(participant) else {
            return Vec::new();
        };
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
            effects.push(Effect::to_participant(
                participant,
                protocol::TIME_ATTACK_SCORE_UPDATE,
                protocol::solo_score_payload(
                    state.scores.get(&participant).copied().unwrap_or(0),
                ),
            ));
        }
        state.advance(participant);
        match state.current_question(participant) {
            Some(next) => {
                let next = next.clone();
                let number = state.progress(participant) + 1;
                state.question_sent_at.insert(participant, ctx.now);
                effects.push(Effect::to_participant(
                    participant,
                    protocol::QUESTION_NEW,
                    protocol::question_payload(&next, number),
                ));
            }
            // pool exhausted before the clock ran out
            None => effects.push(Effect::Finish),
        }
        effects
    }

    fn on_game_end(&self, ctx: &Ctx, state: &LiveState) -> Vec<Effect> {
        let Some(participant) = Self::solo(ctx) else {
            return Vec::new();
        };
        vec![Effect::to_participant(
            participant,
            protocol::TIME_ATTACK_FINISHED,
            protocol::end_payload(ctx.session, state),
        )]
    }
}
