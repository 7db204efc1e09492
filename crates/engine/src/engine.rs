use super::*;
use chrono::Utc;
use qz_bus::EventBus;
use qz_content::Choice;
use qz_content::Question;
use qz_content::QuestionRepo;
use qz_core::Config;
use qz_core::ID;
use qz_core::Mode;
use qz_core::SessionStatus;
use qz_core::TIME_ATTACK_POOL_SIZE;
use qz_core::Tier;
use qz_live::LiveState;
use qz_live::LiveStore;
use qz_store::Participant;
use qz_store::PgErr;
use qz_store::Session;
use qz_store::SessionStore;
use qz_store::UserProfile;
use qz_timers::GAME_TIMERS;
use qz_timers::GameTimer;
use qz_timers::GameTimerKind;
use qz_timers::Timers;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

/// Shared service clients, acquired once at process init.
pub struct Services {
    pub cfg: Config,
    pub store: SessionStore,
    pub live: LiveStore,
    pub timers: Timers,
    pub bus: EventBus,
    pub content: QuestionRepo,
}

/// Why a session could not be started.
#[derive(Debug)]
pub enum StartError {
    /// No question matches the requested tier and categories.
    EmptyPool,
    /// A named user does not exist.
    UnknownUser,
    /// The session to hand off does not exist or is not startable.
    UnknownSession,
    Store(PgErr),
    Live(qz_live::RedisErr),
}

impl std::fmt::Display for StartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPool => write!(f, "no questions available for this setup"),
            Self::UnknownUser => write!(f, "unknown user"),
            Self::UnknownSession => write!(f, "unknown or unstartable session"),
            Self::Store(e) => write!(f, "store failure: {}", e),
            Self::Live(e) => write!(f, "live-state failure: {}", e),
        }
    }
}

impl std::error::Error for StartError {}

impl From<PgErr> for StartError {
    fn from(e: PgErr) -> Self {
        if qz_store::is_foreign_key_violation(&e) {
            Self::UnknownUser
        } else {
            Self::Store(e)
        }
    }
}

impl From<qz_live::RedisErr> for StartError {
    fn from(e: qz_live::RedisErr) -> Self {
        Self::Live(e)
    }
}

/// Manages live session actors and their lifecycles.
///
/// The registry maps session id → actor mailbox. An event for a session
/// with no running actor but an intact checkpoint revives the actor
/// first, which is how timer deliveries keep working across process
/// restarts. Events for unknown or finished sessions drop silently.
pub struct Engine {
    services: Arc<Services>,
    sessions: RwLock<HashMap<ID<Session>, UnboundedSender<Command>>>,
}

impl Engine {
    pub fn new(services: Services) -> Arc<Self> {
        Arc::new(Self {
            services: Arc::new(services),
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Starts a head-to-head duel, padding with bots as requested. The
    /// tier defaults to the mean rating of the human players.
    pub async fn start_quick_duel(
        self: &Arc<Self>,
        users: &[ID<UserProfile>],
        bot_count: usize,
        tier: Option<Tier>,
        duration_minutes: u32,
    ) -> Result<ID<Session>, StartError> {
        let tier = match tier {
            Some(tier) => tier,
            None => self.tier_from_ratings(users).await?,
        };
        self.start_batch_game(
            users,
            bot_count,
            Mode::QuickDuel,
            tier,
            duration_minutes,
            self.services.cfg.question_batch_size,
            protocol::GAME_ERROR,
        )
        .await
    }

    /// Starts a fastest-finger round on the configured shared clock.
    pub async fn start_fastest_finger(
        self: &Arc<Self>,
        users: &[ID<UserProfile>],
        bot_count: usize,
        duration_minutes: Option<u32>,
    ) -> Result<ID<Session>, StartError> {
        let tier = self.tier_from_ratings(users).await?;
        let duration = duration_minutes.unwrap_or(self.services.cfg.fff_duration_minutes);
        self.start_batch_game(
            users,
            bot_count,
            Mode::FastestFingerFirst,
            tier,
            duration,
            self.services.cfg.question_batch_size,
            protocol::GAME_ERROR,
        )
        .await
    }

    /// Starts a solo practice run of exactly `num_questions` questions.
    pub async fn start_practice(
        self: &Arc<Self>,
        user: ID<UserProfile>,
        tier: Option<Tier>,
        categories: Vec<String>,
        num_questions: usize,
    ) -> Result<ID<Session>, StartError> {
        let services = &self.services;
        let tier = match tier {
            Some(tier) => tier,
            None => self.tier_from_ratings(&[user]).await?,
        };
        let (session, participants) = services
            .store
            .create(
                &[user],
                0,
                Mode::Practice,
                tier,
                qz_core::PRACTICE_MAX_MINUTES,
                services.cfg.bot_rating,
            )
            .await?;
        let questions = services
            .content
            .fetch_batch(tier, &categories, num_questions)
            .await?;
        if questions.is_empty() {
            self.abort_start(session, &[user], protocol::PRACTICE_ERROR).await;
            return Err(StartError::EmptyPool);
        }
        self.go(
            session,
            Mode::Practice,
            tier,
            qz_core::PRACTICE_MAX_MINUTES,
            questions,
            &participants,
        )
        .await
    }

    /// Starts a solo time attack against `duration_minutes` on the clock.
    pub async fn start_time_attack(
        self: &Arc<Self>,
        user: ID<UserProfile>,
        tier: Option<Tier>,
        duration_minutes: u32,
    ) -> Result<ID<Session>, StartError> {
        let services = &self.services;
        let tier = match tier {
            Some(tier) => tier,
            None => self.tier_from_ratings(&[user]).await?,
        };
        let (session, participants) = services
            .store
            .create(
                &[user],
                0,
                Mode::TimeAttack,
                tier,
                duration_minutes,
                services.cfg.bot_rating,
            )
            .await?;
        let questions = services
            .content
            .fetch_batch(tier, &[], TIME_ATTACK_POOL_SIZE)
            .await?;
        if questions.is_empty() {
            self.abort_start(session, &[user], protocol::TIME_ATTACK_ERROR)
                .await;
            return Err(StartError::EmptyPool);
        }
        self.go(
            session,
            Mode::TimeAttack,
            tier,
            duration_minutes,
            questions,
            &participants,
        )
        .await
    }

    /// Lobby hand-off: the countdown elapsed on an already-ACTIVE
    /// GROUP_PLAY session; fetch its batch and bring up the actor.
    pub async fn start_group_game(self: &Arc<Self>, session: ID<Session>) -> Result<(), StartError> {
        let services = &self.services;
        let record = services
            .store
            .session(session)
            .await?
            .filter(|s| s.mode() == Mode::GroupPlay && s.status() == SessionStatus::Active)
            .ok_or(StartError::UnknownSession)?;
        let participants = services.store.participants(session).await?;
        let questions = services
            .content
            .fetch_batch(record.tier(), &[], services.cfg.question_batch_size)
            .await?;
        if questions.is_empty() {
            if let Err(e) = services.store.cancel(session).await {
                log::error!("[engine] cancel of {} failed: {}", session, e);
            }
            services
                .bus
                .emit_to_room(
                    session,
                    protocol::GAME_ERROR,
                    protocol::error_payload("no questions available for this setup"),
                )
                .await;
            return Err(StartError::EmptyPool);
        }
        self.go(
            session,
            Mode::GroupPlay,
            record.tier(),
            record.duration_minutes(),
            questions,
            &participants,
        )
        .await?;
        Ok(())
    }

    /// Common tail of the WAITING-session starts.
    async fn start_batch_game(
        self: &Arc<Self>,
        users: &[ID<UserProfile>],
        bot_count: usize,
        mode: Mode,
        tier: Tier,
        duration_minutes: u32,
        batch: usize,
        error_event: &'static str,
    ) -> Result<ID<Session>, StartError> {
        let services = &self.services;
        let (session, participants) = services
            .store
            .create(users, bot_count, mode, tier, duration_minutes, services.cfg.bot_rating)
            .await?;
        let questions = services.content.fetch_batch(tier, &[], batch).await?;
        if questions.is_empty() {
            self.abort_start(session, users, error_event).await;
            return Err(StartError::EmptyPool);
        }
        self.go(session, mode, tier, duration_minutes, questions, &participants)
            .await
    }

    /// Resource-exhaustion path: cancel the provisioned session and tell
    /// the would-be players why.
    async fn abort_start(
        &self,
        session: ID<Session>,
        users: &[ID<UserProfile>],
        error_event: &'static str,
    ) {
        if let Err(e) = self.services.store.cancel(session).await {
            log::error!("[engine] cancel of {} failed: {}", session, e);
        }
        self.services
            .bus
            .emit_to_users(
                users,
                error_event,
                protocol::error_payload("no questions available for this setup"),
            )
            .await;
    }

    /// Activates, checkpoints, arms the whole-game deadline, and spawns
    /// the session actor.
    async fn go(
        self: &Arc<Self>,
        session: ID<Session>,
        mode: Mode,
        tier: Tier,
        duration_minutes: u32,
        questions: Vec<Question>,
        participants: &[Participant],
    ) -> Result<ID<Session>, StartError> {
        use qz_core::Unique;
        let services = &self.services;
        let now = Utc::now();
        let end_time = now + chrono::Duration::minutes(duration_minutes as i64);
        let ids = participants.iter().map(|p| p.id()).collect::<Vec<_>>();
        let mut state = LiveState::new(mode, tier, questions, end_time, &ids);
        if mode == Mode::FastestFingerFirst {
            state = state.with_fff(services.cfg.fff_question_ms, now);
        }
        services.live.set(session, &state).await?;
        if mode != Mode::GroupPlay {
            services.store.activate(session).await?;
        }
        if let Err(e) = services
            .timers
            .schedule(
                GAME_TIMERS,
                &qz_timers::game_end_job(session),
                &GameTimer::game_end(session),
                Duration::from_secs(duration_minutes as u64 * 60),
            )
            .await
        {
            log::error!("[engine] game-end timer for {} failed: {}", session, e);
        }
        let roster = services.store.roster(session).await?;
        self.launch(session, state, roster, Command::Start).await;
        log::info!("[engine] session {} started ({})", session, mode);
        Ok(session)
    }

    async fn launch(
        self: &Arc<Self>,
        session: ID<Session>,
        state: LiveState,
        roster: Vec<qz_store::Enrolled>,
        first: Command,
    ) {
        let (done_tx, done_rx) = oneshot::channel();
        let tx = SessionActor::spawn(session, state, roster, self.services.clone(), done_tx);
        let _ = tx.send(first);
        self.sessions.write().await.insert(session, tx);
        let engine = self.clone();
        tokio::spawn(async move {
            let _ = done_rx.await;
            engine.sessions.write().await.remove(&session);
            log::info!("[engine] session {} cleaned up", session);
        });
    }

    /// Mean-rating tier for a set of users.
    async fn tier_from_ratings(&self, users: &[ID<UserProfile>]) -> Result<Tier, StartError> {
        let ratings = self.services.store.ratings(users).await?;
        if ratings.len() < users.len() {
            return Err(StartError::UnknownUser);
        }
        let mean = ratings.values().sum::<i32>() / ratings.len().max(1) as i32;
        Ok(qz_content::tier_for_rating(mean))
    }

    pub async fn handle_answer(
        self: &Arc<Self>,
        session: ID<Session>,
        participant: ID<Participant>,
        question: ID<Question>,
        option: ID<Choice>,
    ) {
        self.send(
            session,
            Command::Answer {
                participant,
                question,
                option,
            },
        )
        .await;
    }

    pub async fn handle_skip(
        self: &Arc<Self>,
        session: ID<Session>,
        participant: ID<Participant>,
    ) {
        self.send(session, Command::Skip { participant }).await;
    }

    /// `practice:next_question`, `time_attack:request_next_question`, and
    /// `quickduel:request_first_question` all land here.
    pub async fn handle_request_next(
        self: &Arc<Self>,
        session: ID<Session>,
        participant: ID<Participant>,
    ) {
        self.send(session, Command::RequestNext { participant }).await;
    }

    /// Routes a claimed game-timers job into the owning actor.
    pub async fn deliver(self: &Arc<Self>, timer: GameTimer) {
        let Some(kind) = timer.kind() else {
            log::warn!("[engine] undecodable timer payload dropped");
            return;
        };
        let command = match kind {
            GameTimerKind::GameEnd => Command::GameEnd,
            GameTimerKind::Advance(index) => Command::Advance { index },
            GameTimerKind::QuestionTimeout(question) => Command::QuestionTimeout { question },
        };
        self.send(timer.session_id, command).await;
    }

    /// Delivers into the session's actor, reviving it from the
    /// checkpoint if this process does not hold it. Unknown and
    /// non-ACTIVE sessions drop silently.
    async fn send(self: &Arc<Self>, session: ID<Session>, command: Command) {
        match self.sender_for(session).await {
            Some(tx) => {
                // a send to an actor that just terminated is a stale event
                let _ = tx.send(command);
            }
            None => log::debug!("[engine] dropped event for inactive session {}", session),
        }
    }

    async fn sender_for(
        self: &Arc<Self>,
        session: ID<Session>,
    ) -> Option<UnboundedSender<Command>> {
        if let Some(tx) = self.sessions.read().await.get(&session) {
            return Some(tx.clone());
        }
        self.revive(session).await
    }

    /// Crash-recovery path: rebuild the actor from the durable record
    /// plus the live checkpoint.
    async fn revive(self: &Arc<Self>, session: ID<Session>) -> Option<UnboundedSender<Command>> {
        let services = &self.services;
        let record = services
            .store
            .session(session)
            .await
            .map_err(|e| log::error!("[engine] session lookup failed: {}", e))
            .ok()??;
        if record.status() != SessionStatus::Active {
            return None;
        }
        let state = services
            .live
            .get(session)
            .await
            .map_err(|e| log::error!("[engine] checkpoint read failed: {}", e))
            .ok()??;
        let roster = services
            .store
            .roster(session)
            .await
            .map_err(|e| log::error!("[engine] roster load failed: {}", e))
            .ok()?;
        let mut sessions = self.sessions.write().await;
        if let Some(tx) = sessions.get(&session) {
            return Some(tx.clone());
        }
        log::info!("[engine] reviving session {} from checkpoint", session);
        let (done_tx, done_rx) = oneshot::channel();
        let tx = SessionActor::spawn(session, state, roster, services.clone(), done_tx);
        let _ = tx.send(Command::Resume);
        sessions.insert(session, tx.clone());
        let engine = self.clone();
        tokio::spawn(async move {
            let _ = done_rx.await;
            engine.sessions.write().await.remove(&session);
            log::info!("[engine] session {} cleaned up", session);
        });
        Some(tx)
    }
}

/// game-timers queue handler: parse and route to the engine.
pub struct GameTimerHandler(pub Arc<Engine>);

#[async_trait::async_trait]
impl qz_timers::JobHandler for GameTimerHandler {
    async fn handle(&self, payload: &str) {
        match serde_json::from_str::<GameTimer>(payload) {
            Ok(timer) => self.0.deliver(timer).await,
            Err(e) => log::warn!("[engine] unparseable timer job dropped: {}", e),
        }
    }
}
