use super::*;

/// Head-to-head duel: per-participant progression, +10 per correct
/// answer, whole score map broadcast to the room on every scoring answer.
/// The batch is not a bound on play; only the whole-game timer ends the
/// session, so a participant who finishes early just waits.
pub struct QuickDuel;

impl Rules for QuickDuel {
    fn on_start(&self, ctx: &Ctx, state: &mut LiveState) -> Vec<Effect> {
        let mut effects = vec![Effect::to_users(
            ctx.human_users(),
            protocol::MATCH_FOUND,
            serde_json::json!({
                "sessionId": ctx.session,
                "mode": state.mode,
                "tier": state.tier,
                "endTime": state.end_time.to_rfc3339(),
                "participants": protocol::roster_summary(&ctx.roster),
            }),
        )];
        for participant in ctx.participants() {
            effects.extend(serve_question(ctx, state, participant).unwrap_or_default());
        }
        effects
    }

    fn on_answer(
        &self,
        ctx: &Ctx,
        state: &mut LiveState,
        participant: ID<Participant>,
        question: ID<Question>,
        option: ID<Choice>,
    ) -> Vec<Effect> {
        progression_answer(ctx, state, participant, question, option, protocol::SCORE_UPDATE)
    }

    fn on_skip(
        &self,
        ctx: &Ctx,
        state: &mut LiveState,
        participant: ID<Participant>,
    ) -> Vec<Effect> {
        progression_skip(ctx, state, participant)
    }

    fn on_request_next(
        &self,
        ctx: &Ctx,
        state: &mut LiveState,
        participant: ID<Participant>,
    ) -> Vec<Effect> {
        redeliver_question(ctx, state, participant)
    }

    fn on_resume(&self, ctx: &Ctx, state: &mut LiveState) -> Vec<Effect> {
        ctx.bots()
            .iter()
            .map(|bot| bot.participant)
            .collect::<Vec<_>>()
            .into_iter()
            .flat_map(|participant| redeliver_question(ctx, state, participant))
            .collect()
    }

    fn on_game_end(&self, ctx: &Ctx, state: &LiveState) -> Vec<Effect> {
        vec![Effect::to_room(
            protocol::GAME_END,
            protocol::end_payload(ctx.session, state),
        )]
    }
}
