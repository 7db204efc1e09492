use super::*;
use chrono::DateTime;
use chrono::Utc;
use qz_bus::EventBus;
use qz_core::ID;
use qz_core::Tier;
use qz_engine::Engine;
use qz_store::Enrolled;
use qz_store::Participant;
use qz_store::Session;
use qz_store::SessionStore;
use qz_store::UserProfile;
use qz_timers::LOBBY_COUNTDOWN_JOBS;
use qz_timers::LobbyCountdown;
use qz_timers::Timers;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// I/O surface the lobby state machine drives: durable session rows, the
/// countdown job, room fan-out, and the engine hand-off.
///
/// The state machine itself stays pluggable the way game participants do
/// in a room: [`PlatformBackend`] wires the real services, and tests
/// drive the same transitions against memory.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn session(&self, id: ID<Session>) -> Result<Option<Session>, LobbyError>;
    async fn session_by_code(&self, code: &str) -> Result<Option<Session>, LobbyError>;
    async fn code_in_use(&self, code: &str) -> Result<bool, LobbyError>;
    /// None when the code lost a creation race and the caller should
    /// draw again.
    async fn create_lobby(
        &self,
        host: ID<UserProfile>,
        tier: Tier,
        duration_minutes: u32,
        min_players: usize,
        max_players: usize,
        code: &str,
    ) -> Result<Option<Session>, LobbyError>;
    /// None when the lobby is full or no longer joinable; `Duplicate`
    /// when the user is already seated.
    async fn join(
        &self,
        session: ID<Session>,
        user: ID<UserProfile>,
    ) -> Result<Option<Participant>, LobbyError>;
    async fn leave(
        &self,
        session: ID<Session>,
        user: ID<UserProfile>,
    ) -> Result<Option<ID<Participant>>, LobbyError>;
    async fn participant_count(&self, session: ID<Session>) -> Result<usize, LobbyError>;
    async fn roster(&self, session: ID<Session>) -> Result<Vec<Enrolled>, LobbyError>;
    async fn begin_countdown(
        &self,
        session: ID<Session>,
        at: DateTime<Utc>,
    ) -> Result<bool, LobbyError>;
    async fn cancel_countdown(&self, session: ID<Session>) -> Result<bool, LobbyError>;
    async fn activate(&self, session: ID<Session>) -> Result<bool, LobbyError>;
    async fn dissolve(&self, session: ID<Session>) -> Result<bool, LobbyError>;
    async fn schedule_countdown(
        &self,
        session: ID<Session>,
        delay: Duration,
    ) -> Result<(), LobbyError>;
    async fn cancel_countdown_job(&self, session: ID<Session>) -> Result<(), LobbyError>;
    async fn emit_to_room(&self, session: ID<Session>, event: &str, payload: Value);
    async fn start_group_game(&self, session: ID<Session>);
}

/// Production wiring over the real store, job queue, bus, and engine.
pub struct PlatformBackend {
    store: SessionStore,
    timers: Timers,
    bus: EventBus,
    engine: Arc<Engine>,
}

impl PlatformBackend {
    pub fn new(store: SessionStore, timers: Timers, bus: EventBus, engine: Arc<Engine>) -> Self {
        Self {
            store,
            timers,
            bus,
            engine,
        }
    }
}

#[async_trait::async_trait]
impl Backend for PlatformBackend {
    async fn session(&self, id: ID<Session>) -> Result<Option<Session>, LobbyError> {
        Ok(self.store.session(id).await?)
    }
    async fn session_by_code(&self, code: &str) -> Result<Option<Session>, LobbyError> {
        Ok(self.store.session_by_code(code).await?)
    }
    async fn code_in_use(&self, code: &str) -> Result<bool, LobbyError> {
        Ok(self.store.code_in_use(code).await?)
    }
    async fn create_lobby(
        &self,
        host: ID<UserProfile>,
        tier: Tier,
        duration_minutes: u32,
        min_players: usize,
        max_players: usize,
        code: &str,
    ) -> Result<Option<Session>, LobbyError> {
        match self
            .store
            .create_lobby(host, tier, duration_minutes, min_players, max_players, code)
            .await
        {
            Ok(session) => Ok(Some(session)),
            Err(e) if qz_store::is_unique_violation(&e) => Ok(None),
            Err(e) => Err(LobbyError::Store(e)),
        }
    }
    async fn join(
        &self,
        session: ID<Session>,
        user: ID<UserProfile>,
    ) -> Result<Option<Participant>, LobbyError> {
        Ok(self.store.join(session, user).await?)
    }
    async fn leave(
        &self,
        session: ID<Session>,
        user: ID<UserProfile>,
    ) -> Result<Option<ID<Participant>>, LobbyError> {
        Ok(self.store.leave(session, user).await?)
    }
    async fn participant_count(&self, session: ID<Session>) -> Result<usize, LobbyError> {
        Ok(self.store.participant_count(session).await?)
    }
    async fn roster(&self, session: ID<Session>) -> Result<Vec<Enrolled>, LobbyError> {
        Ok(self.store.roster(session).await?)
    }
    async fn begin_countdown(
        &self,
        session: ID<Session>,
        at: DateTime<Utc>,
    ) -> Result<bool, LobbyError> {
        Ok(self.store.begin_countdown(session, at).await?)
    }
    async fn cancel_countdown(&self, session: ID<Session>) -> Result<bool, LobbyError> {
        Ok(self.store.cancel_countdown(session).await?)
    }
    async fn activate(&self, session: ID<Session>) -> Result<bool, LobbyError> {
        Ok(self.store.activate(session).await?)
    }
    async fn dissolve(&self, session: ID<Session>) -> Result<bool, LobbyError> {
        Ok(self.store.dissolve(session).await?)
    }
    async fn schedule_countdown(
        &self,
        session: ID<Session>,
        delay: Duration,
    ) -> Result<(), LobbyError> {
        self.timers
            .schedule(
                LOBBY_COUNTDOWN_JOBS,
                &qz_timers::lobby_job(session),
                &LobbyCountdown {
                    session_id: session,
                },
                delay,
            )
            .await
            .map_err(LobbyError::Jobs)
    }
    async fn cancel_countdown_job(&self, session: ID<Session>) -> Result<(), LobbyError> {
        self.timers
            .cancel(LOBBY_COUNTDOWN_JOBS, &qz_timers::lobby_job(session))
            .await
            .map_err(LobbyError::Jobs)
    }
    async fn emit_to_room(&self, session: ID<Session>, event: &str, payload: Value) {
        self.bus.emit_to_room(session, event, payload).await;
    }
    async fn start_group_game(&self, session: ID<Session>) {
        if let Err(e) = self.engine.start_group_game(session).await {
            log::error!("[lobby {}] game start failed: {}", session, e);
        }
    }
}
