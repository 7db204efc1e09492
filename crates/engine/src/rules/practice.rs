use super::*;

/// Solo practice with feedback. The client drives the pace: each
/// `practice:next_question` delivers the current question exactly once,
/// and every answer is acknowledged with the correct option, the
/// explanation, and the learning tip. The session ends itself when the
/// last question has a recorded result rather than waiting for the
/// client to stop asking.
pub struct Practice;

impl Practice {
    fn solo(ctx: &Ctx) -> Option<ID<Participant>> {
        ctx.roster.first().map(|e| e.participant)
    }
}

impl Rules for Practice {
    fn on_start(&self, ctx: &Ctx, state: &mut LiveState) -> Vec<Effect> {
        let Some(participant) = Self::solo(ctx) else {
            return Vec::new();
        };
        vec![Effect::to_participant(
            participant,
            protocol::PRACTICE_STARTED,
            serde_json::json!({
                "sessionId": ctx.session,
                "participantId": participant,
                "totalQuestions": state.questions.len(),
            }),
        )]
    }

    fn on_request_next(
        &self,
        ctx: &Ctx,
        state: &mut LiveState,
        participant: ID<Participant>,
    ) -> Vec<Effect> {
        // a question is already outstanding; resending must not re-emit
        if state.question_sent_at.contains_key(&participant) {
            return Vec::new();
        }
        let Some(question) = state.current_question(participant) else {
            return Vec::new();
        };
        let question = question.clone();
        let number = state.progress(participant) + 1;
        state.question_sent_at.insert(participant, ctx.now);
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
        let Some(current) = state.current_question(participant) else {
            return Vec::new();
        };
        if current.id() != question {
            return Vec::new();
        }
        let correct = current.is_correct(option);
        let feedback = serde_json::json!({
            "correct": correct,
            "correctOptionId": current.correct(),
            "explanation": current.explanation(),
            "learningTip": current.learning_tip(),
        });
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
        if correct {
            state.award(participant, qz_core::POINTS_PER_CORRECT);
        }
        state.advance(participant);
        let mut effects = vec![Effect::to_participant(
            participant,
            protocol::ANSWER_FEEDBACK,
            feedback,
        )];
        if state.current_question(participant).is_none() {
            effects.push(Effect::Finish);
        }
        effects
    }

    fn on_game_end(&self, ctx: &Ctx, state: &LiveState) -> Vec<Effect> {
        let Some(participant) = Self::solo(ctx) else {
            return Vec::new();
        };
        vec![Effect::to_participant(
            participant,
            protocol::PRACTICE_FINISHED,
            protocol::practice_end_payload(ctx.session, state, participant),
        )]
    }
}
