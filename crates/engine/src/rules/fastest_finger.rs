use super::*;
use qz_core::ADVANCE_AFTER_POINT;
use qz_core::ADVANCE_AFTER_TIMEOUT;
use qz_core::FFF_GRACE;
use qz_core::FFF_POINT;
use std::time::Duration;

/// Race to answer on a shared clock. One point per question, to the
/// single first correct arrival as ordered by the session's writer;
/// later correct answers are announced but never score. Question windows
/// are durable timer jobs, and the inter-question gaps are too, so a
/// worker restart resumes pacing instead of stalling the match.
pub struct FastestFinger;

impl FastestFinger {
    /// Opens the question window at `index`, or finishes the game when
    /// the batch or the whole-game clock is spent.
    fn start_question(&self, ctx: &Ctx, state: &mut LiveState, index: usize) -> Vec<Effect> {
        if state.question_at(index).is_none() || state.past_deadline(ctx.now) {
            return vec![Effect::Finish];
        }
        let question = state.question_at(index).expect("bounds checked").clone();
        let time_per_question = {
            let fff = state.fff.as_mut().expect("fff sessions carry fff state");
            fff.current_question_index = index;
            fff.question_start_time = ctx.now;
            fff.question_answers.clear();
            fff.time_per_question
        };
        let window = Duration::from_millis(time_per_question);
        let mut effects = vec![
            Effect::to_room(
                protocol::FF_NEW_QUESTION,
                serde_json::json!({
                    "question": question.view(),
                    "questionNumber": index + 1,
                    "timeLimit": time_per_question,
                }),
            ),
            Effect::ScheduleQuestionTimeout {
                question: question.id(),
                index,
                delay: window,
            },
        ];
        for bot in ctx.bots() {
            let decision = qz_bots::choose_answer(
                &question,
                Mode::FastestFingerFirst,
                bot.rating,
                Some(window),
            );
            effects.push(Effect::ScheduleBot {
                participant: bot.participant,
                question: question.id(),
                choice: decision.choice,
                delay: decision.delay,
            });
        }
        effects
    }
}

impl Rules for FastestFinger {
    fn on_start(&self, _ctx: &Ctx, _state: &mut LiveState) -> Vec<Effect> {
        vec![Effect::ScheduleAdvance {
            index: 0,
            delay: FFF_GRACE,
        }]
    }

    fn on_answer(
        &self,
        ctx: &Ctx,
        state: &mut LiveState,
        participant: ID<Participant>,
        question: ID<Question>,
        option: ID<Choice>,
    ) -> Vec<Effect> {
        let Some(current) = state.fff_question() else {
            return Vec::new();
        };
        if current.id() != question || state.fff_answered(participant) {
            return Vec::new();
        }
        let correct = current.is_correct(option);
        let (index, start, window) = {
            let fff = state.fff.as_ref().expect("fff sessions carry fff state");
            (
                fff.current_question_index,
                fff.question_start_time,
                fff.time_per_question,
            )
        };
        let deadline = start + chrono::Duration::milliseconds(window as i64);
        if ctx.now > deadline {
            return Vec::new();
        }
        let first = correct && !state.fff_point_taken();
        let correct_option = current.correct();
        state
            .fff
            .as_mut()
            .expect("fff sessions carry fff state")
            .question_answers
            .push(qz_live::QuestionAnswer {
                participant_id: participant,
                option_id: option,
                timestamp: ctx.now,
                correct,
            });
        state.record(
            participant,
            AnswerRecord {
                question_id: question,
                time_taken: elapsed_ms(Some(start), ctx.now),
                action: AnswerAction::Answered,
                correct,
            },
        );
        let mut effects = vec![Effect::to_room(
            protocol::FF_PLAYER_ANSWERED,
            serde_json::json!({ "participantId": participant, "correct": correct }),
        )];
        if first {
            state.award(participant, FFF_POINT);
            effects.push(Effect::to_room(
                protocol::FF_POINT_AWARDED,
                serde_json::json!({
                    "participantId": participant,
                    "allScores": state.scores,
                    "correctOptionId": correct_option,
                }),
            ));
            effects.push(Effect::CancelQuestionTimeout);
            effects.push(Effect::ScheduleAdvance {
                index: index + 1,
                delay: ADVANCE_AFTER_POINT,
            });
        }
        effects
    }

    fn on_question_timeout(
        &self,
        ctx: &Ctx,
        state: &mut LiveState,
        question: ID<Question>,
    ) -> Vec<Effect> {
        let Some(current) = state.fff_question() else {
            return Vec::new();
        };
        // a late job for an already-settled or already-advanced question
        if current.id() != question || state.fff_point_taken() {
            return Vec::new();
        }
        // redelivered job: every participant already has a record
        let all_recorded = ctx.participants().iter().all(|p| {
            state
                .results
                .get(p)
                .map(|log| log.iter().any(|r| r.question_id == question))
                .unwrap_or(false)
        });
        if all_recorded {
            return Vec::new();
        }
        let correct_option = current.correct();
        let (index, window) = {
            let fff = state.fff.as_ref().expect("fff sessions carry fff state");
            (fff.current_question_index, fff.time_per_question)
        };
        let silent = ctx
            .participants()
            .into_iter()
            .filter(|p| !state.fff_answered(*p))
            .collect::<Vec<_>>();
        for participant in silent {
            state.record(
                participant,
                AnswerRecord {
                    question_id: question,
                    time_taken: window,
                    action: AnswerAction::Timeout,
                    correct: false,
                },
            );
        }
        vec![
            Effect::to_room(
                protocol::FF_QUESTION_TIMEOUT,
                serde_json::json!({
                    "questionNumber": index + 1,
                    "correctOptionId": correct_option,
                }),
            ),
            Effect::ScheduleAdvance {
                index: index + 1,
                delay: ADVANCE_AFTER_TIMEOUT,
            },
        ]
    }

    fn on_advance(&self, ctx: &Ctx, state: &mut LiveState, index: usize) -> Vec<Effect> {
        let Some(fff) = state.fff.as_ref() else {
            return Vec::new();
        };
        if index == 0 {
            if fff.started {
                return Vec::new();
            }
            state.fff.as_mut().expect("checked above").started = true;
            let mut effects = vec![Effect::to_users(
                ctx.human_users(),
                protocol::FF_MATCH_FOUND,
                serde_json::json!({
                    "sessionId": ctx.session,
                    "endTime": state.end_time.to_rfc3339(),
                    "timePerQuestion": state.fff.as_ref().expect("checked above").time_per_question,
                    "participants": protocol::roster_summary(&ctx.roster),
                }),
            )];
            effects.extend(self.start_question(ctx, state, 0));
            effects
        } else {
            if !fff.started || index != fff.current_question_index + 1 {
                return Vec::new();
            }
            self.start_question(ctx, state, index)
        }
    }

    fn on_resume(&self, ctx: &Ctx, state: &mut LiveState) -> Vec<Effect> {
        let Some(current) = state.fff_question() else {
            return Vec::new();
        };
        let question = current.clone();
        let fff = state.fff.as_ref().expect("fff sessions carry fff state");
        if !fff.started {
            return Vec::new();
        }
        let deadline =
            fff.question_start_time + chrono::Duration::milliseconds(fff.time_per_question as i64);
        let remaining = (deadline - ctx.now).num_milliseconds();
        if remaining <= 0 {
            return Vec::new();
        }
        ctx.bots()
            .iter()
            .filter(|bot| !state.fff_answered(bot.participant))
            .map(|bot| {
                let decision = qz_bots::choose_answer(
                    &question,
                    Mode::FastestFingerFirst,
                    bot.rating,
                    Some(Duration::from_millis(remaining as u64)),
                );
                Effect::ScheduleBot {
                    participant: bot.participant,
                    question: question.id(),
                    choice: decision.choice,
                    delay: decision.delay,
                }
            })
            .collect()
    }

    fn on_game_end(&self, ctx: &Ctx, state: &LiveState) -> Vec<Effect> {
        vec![Effect::to_room(
            protocol::FF_GAME_END,
            protocol::end_payload(ctx.session, state),
        )]
    }
}
