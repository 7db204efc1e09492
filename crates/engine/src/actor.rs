use super::*;
use chrono::Utc;
use qz_content::Choice;
use qz_content::Question;
use qz_core::ID;
use qz_core::Score;
use qz_live::LiveState;
use qz_store::Enrolled;
use qz_store::Participant;
use qz_store::Session;
use qz_timers::GAME_TIMERS;
use qz_timers::GameTimer;
use std::sync::Arc;
use tokio::sync::mpsc::*;
use tokio::sync::oneshot;

/// Everything that can happen to a live session. Client events, bot
/// answers, and durable timer firings all arrive as commands on the
/// session actor's mailbox, which is what serializes them.
#[derive(Debug)]
pub enum Command {
    /// First message after a fresh start.
    Start,
    /// First message after revival from a checkpoint.
    Resume,
    Answer {
        participant: ID<Participant>,
        question: ID<Question>,
        option: ID<Choice>,
    },
    Skip {
        participant: ID<Participant>,
    },
    RequestNext {
        participant: ID<Participant>,
    },
    QuestionTimeout {
        question: ID<Question>,
    },
    Advance {
        index: usize,
    },
    GameEnd,
}

/// Single writer for one session.
///
/// Owns the authoritative [`LiveState`] in memory, applies rules
/// decisions, performs the I/O their effects describe, and checkpoints
/// the state after every mutation. Bot answers are session-scoped tasks
/// aborted at termination so nothing strays into a finished session.
pub struct SessionActor {
    session: ID<Session>,
    state: LiveState,
    roster: Vec<Enrolled>,
    services: Arc<Services>,
    getter: UnboundedReceiver<Command>,
    sender: UnboundedSender<Command>,
    bots: Vec<tokio::task::JoinHandle<()>>,
}

impl SessionActor {
    /// Spawns the actor task and returns its mailbox. `done` fires when
    /// the session terminates so the registry can forget it.
    pub fn spawn(
        session: ID<Session>,
        state: LiveState,
        roster: Vec<Enrolled>,
        services: Arc<Services>,
        done: oneshot::Sender<()>,
    ) -> UnboundedSender<Command> {
        let (tx, rx) = unbounded_channel();
        let actor = Self {
            session,
            state,
            roster,
            services,
            getter: rx,
            sender: tx.clone(),
            bots: Vec::new(),
        };
        tokio::spawn(async move {
            actor.run().await;
            let _ = done.send(());
        });
        tx
    }

    async fn run(mut self) {
        log::debug!("[session {}] actor running", self.session);
        while let Some(command) = self.getter.recv().await {
            if self.step(command).await {
                break;
            }
        }
        for bot in &self.bots {
            bot.abort();
        }
        log::info!("[session {}] actor stopped", self.session);
    }

    /// Applies one command. Returns true when the session is over.
    async fn step(&mut self, command: Command) -> bool {
        log::trace!("[session {}] {:?}", self.session, command);
        let rules = rules_for(self.state.mode);
        let ctx = self.ctx();
        let effects = match command {
            Command::Start => rules.on_start(&ctx, &mut self.state),
            Command::Resume => rules.on_resume(&ctx, &mut self.state),
            Command::Answer {
                participant,
                question,
                option,
            } => rules.on_answer(&ctx, &mut self.state, participant, question, option),
            Command::Skip { participant } => rules.on_skip(&ctx, &mut self.state, participant),
            Command::RequestNext { participant } => {
                rules.on_request_next(&ctx, &mut self.state, participant)
            }
            Command::QuestionTimeout { question } => {
                rules.on_question_timeout(&ctx, &mut self.state, question)
            }
            Command::Advance { index } => rules.on_advance(&ctx, &mut self.state, index),
            Command::GameEnd => vec![Effect::Finish],
        };
        let finish = self.apply(effects).await;
        if finish {
            self.end_of_game().await;
            return true;
        }
        if let Err(e) = self.services.live.set(self.session, &self.state).await {
            log::error!("[session {}] checkpoint failed: {}", self.session, e);
        }
        false
    }

    fn ctx(&self) -> Ctx {
        Ctx {
            session: self.session,
            roster: self.roster.clone(),
            cfg: self.services.cfg,
            now: Utc::now(),
        }
    }

    async fn apply(&mut self, effects: Vec<Effect>) -> bool {
        let mut finish = false;
        for effect in effects {
            match effect {
                Effect::Emit {
                    target,
                    event,
                    payload,
                } => self.emit(target, event, payload).await,
                Effect::ScheduleQuestionTimeout {
                    question,
                    index,
                    delay,
                } => {
                    let job = qz_timers::question_job(self.session, index);
                    if let Err(e) = self
                        .services
                        .timers
                        .schedule(
                            GAME_TIMERS,
                            &job,
                            &GameTimer::question(self.session, question),
                            delay,
                        )
                        .await
                    {
                        log::error!("[session {}] question timer failed: {}", self.session, e);
                    }
                    if let Err(e) = self.services.live.set_timer_job(self.session, &job).await {
                        log::error!("[session {}] timer slot write failed: {}", self.session, e);
                    }
                }
                Effect::CancelQuestionTimeout => match self
                    .services
                    .live
                    .take_timer_job(self.session)
                    .await
                {
                    Ok(Some(job)) => {
                        if let Err(e) = self.services.timers.cancel(GAME_TIMERS, &job).await {
                            log::error!("[session {}] timer cancel failed: {}", self.session, e);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => log::error!("[session {}] timer slot read failed: {}", self.session, e),
                },
                Effect::ScheduleAdvance { index, delay } => {
                    let job = qz_timers::advance_job(self.session, index);
                    if let Err(e) = self
                        .services
                        .timers
                        .schedule(
                            GAME_TIMERS,
                            &job,
                            &GameTimer::advance(self.session, index),
                            delay,
                        )
                        .await
                    {
                        log::error!("[session {}] advance timer failed: {}", self.session, e);
                    }
                }
                Effect::ScheduleBot {
                    participant,
                    question,
                    choice,
                    delay,
                } => {
                    let tx = self.sender.clone();
                    self.bots.push(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(Command::Answer {
                            participant,
                            question,
                            option: choice,
                        });
                    }));
                }
                Effect::Finish => finish = true,
            }
        }
        finish
    }

    async fn emit(&self, target: EmitTarget, event: &'static str, payload: serde_json::Value) {
        let bus = &self.services.bus;
        match target {
            EmitTarget::Users(users) => bus.emit_to_users(&users, event, payload).await,
            EmitTarget::Participants(participants) => {
                bus.emit_to_participants(&participants, event, payload).await
            }
            EmitTarget::Room => bus.emit_to_room(self.session, event, payload).await,
        }
    }

    /// Terminal procedure: cancel pending timers, settle ratings, clear
    /// the checkpoint, persist final scores, then announce the result.
    async fn end_of_game(&mut self) {
        log::info!("[session {}] ending", self.session);
        let services = self.services.clone();
        if let Err(e) = services
            .timers
            .cancel(GAME_TIMERS, &qz_timers::game_end_job(self.session))
            .await
        {
            log::error!("[session {}] game-end cancel failed: {}", self.session, e);
        }
        if let Ok(Some(job)) = services.live.take_timer_job(self.session).await {
            let _ = services.timers.cancel(GAME_TIMERS, &job).await;
        }
        self.settle_ratings().await;
        if let Err(e) = services.live.delete(self.session).await {
            log::error!("[session {}] live delete failed: {}", self.session, e);
        }
        let scores = self
            .roster
            .iter()
            .map(|e| {
                (
                    e.participant,
                    self.state.scores.get(&e.participant).copied().unwrap_or(0),
                )
            })
            .collect::<Vec<(ID<Participant>, Score)>>();
        if let Err(e) = services.store.end(self.session, &scores).await {
            log::error!("[session {}] final persist failed: {}", self.session, e);
        }
        let ctx = self.ctx();
        for effect in rules_for(self.state.mode).on_game_end(&ctx, &self.state) {
            if let Effect::Emit {
                target,
                event,
                payload,
            } = effect
            {
                self.emit(target, event, payload).await;
            }
        }
    }

    /// Symmetric 1v1 rating update for the competitive modes, applied in
    /// one store transaction; skipped unless exactly two humans played.
    async fn settle_ratings(&self) {
        if !self.state.mode.rated() {
            return;
        }
        let humans = self
            .roster
            .iter()
            .filter(|e| !e.is_bot)
            .collect::<Vec<_>>();
        let [a, b] = humans.as_slice() else {
            return;
        };
        let services = &self.services;
        let score = |p: ID<Participant>| self.state.scores.get(&p).copied().unwrap_or(0);
        let outcome = qz_rating::normalize(score(a.participant), score(b.participant));
        let current = match services.store.ratings(&[a.user, b.user]).await {
            Ok(current) => current,
            Err(e) => {
                log::error!("[session {}] rating lookup failed: {}", self.session, e);
                return;
            }
        };
        let ra = current.get(&a.user).copied().unwrap_or(a.rating);
        let rb = current.get(&b.user).copied().unwrap_or(b.rating);
        let (na, nb) = qz_rating::update(ra, rb, outcome, services.cfg.k_factor);
        if let Err(e) = services
            .store
            .apply_ratings((a.user, na), (b.user, nb))
            .await
        {
            log::error!("[session {}] rating update failed: {}", self.session, e);
            return;
        }
        if let Err(e) = services.live.invalidate_leaderboards(&[a.user, b.user]).await {
            log::warn!("[session {}] leaderboard invalidation failed: {}", self.session, e);
        }
    }
}
