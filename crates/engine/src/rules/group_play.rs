use super::*;

/// Host-managed group game, entered from a lobby countdown. Progression
/// and scoring work like a quick duel, but every announcement is
/// room-wide: the lobby's members are already joined to the session room.
pub struct GroupPlay;

impl Rules for GroupPlay {
    fn on_start(&self, ctx: &Ctx, state: &mut LiveState) -> Vec<Effect> {
        let mut effects = vec![Effect::to_room(
            protocol::GROUP_STARTED,
            serde_json::json!({
                "sessionId": ctx.session,
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
        progression_answer(
            ctx,
            state,
            participant,
            question,
            option,
            protocol::GROUP_SCORE_UPDATE,
        )
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
            protocol::GROUP_FINISHED,
            protocol::end_payload(ctx.session, state),
        )]
    }
}
