use super::*;
use chrono::Utc;
use qz_core::Config;
use qz_core::ID;
use qz_core::LOBBY_DURATIONS_MIN;
use qz_core::LOBBY_MAX_CAP;
use qz_core::LOBBY_MIN_DEFAULT;
use qz_core::SessionStatus;
use qz_core::Tier;
use qz_core::Unique;
use qz_store::Session;
use qz_store::UserProfile;
use serde_json::json;
use std::sync::Arc;

/// State machine over a GROUP_PLAY session before it goes ACTIVE.
///
/// LOBBY ⇄ READY_COUNTDOWN, then hand-off to the engine when the
/// countdown job fires, or dissolution when the host walks away. Every
/// membership change re-broadcasts the lobby projection to the room.
pub struct LobbyController {
    cfg: Config,
    backend: Arc<dyn Backend>,
}

impl LobbyController {
    pub fn new(cfg: Config, backend: Arc<dyn Backend>) -> Arc<Self> {
        Arc::new(Self { cfg, backend })
    }

    /// Opens a lobby with the host seated, addressed by a fresh unique
    /// room code.
    pub async fn create_lobby(
        &self,
        host: ID<UserProfile>,
        tier: Tier,
        duration_minutes: u32,
        max_players: usize,
    ) -> Result<Session, LobbyError> {
        if !LOBBY_DURATIONS_MIN.contains(&duration_minutes) {
            return Err(LobbyError::InvalidDuration(duration_minutes));
        }
        if !(LOBBY_MIN_DEFAULT..=LOBBY_MAX_CAP).contains(&max_players) {
            return Err(LobbyError::InvalidCapacity(max_players));
        }
        let session = self
            .provision(host, tier, duration_minutes, max_players)
            .await?;
        log::info!(
            "[lobby {}] created by {} (code {})",
            session.id(),
            host,
            session.room_code().unwrap_or("?")
        );
        self.broadcast_update(&session).await?;
        Ok(session)
    }

    /// Rejection resampling: collisions with live codes retry with a
    /// fresh draw, racing inserts settle on the unique index.
    async fn provision(
        &self,
        host: ID<UserProfile>,
        tier: Tier,
        duration_minutes: u32,
        max_players: usize,
    ) -> Result<Session, LobbyError> {
        loop {
            let code = generate_code(&mut rand::rng());
            if self.backend.code_in_use(&code).await? {
                continue;
            }
            match self
                .backend
                .create_lobby(host, tier, duration_minutes, LOBBY_MIN_DEFAULT, max_players, &code)
                .await?
            {
                Some(session) => return Ok(session),
                None => continue,
            }
        }
    }

    /// Seats a user in an open lobby.
    pub async fn join(
        &self,
        user: ID<UserProfile>,
        code: &str,
    ) -> Result<Session, LobbyError> {
        let session = self.lobby_by_code(code).await?;
        if session.status() != SessionStatus::Lobby {
            return Err(LobbyError::Closed);
        }
        match self.backend.join(session.id(), user).await? {
            Some(_) => {}
            None => {
                let count = self.backend.participant_count(session.id()).await?;
                return Err(if count >= session.max_players() {
                    LobbyError::Full
                } else {
                    LobbyError::Closed
                });
            }
        }
        log::info!("[lobby {}] {} joined", session.id(), user);
        let session = self.refresh(session.id()).await?;
        self.broadcast_update(&session).await?;
        Ok(session)
    }

    /// Unseats a user. A departing host dissolves the lobby; any other
    /// leave that drops a running countdown below the minimum cancels
    /// the countdown.
    pub async fn leave(&self, user: ID<UserProfile>, code: &str) -> Result<(), LobbyError> {
        let session = self.lobby_by_code(code).await?;
        if session.host() == Some(user) {
            return self.dissolve(&session, "host left the lobby").await;
        }
        if self.backend.leave(session.id(), user).await?.is_none() {
            return Err(LobbyError::NotSeated);
        }
        log::info!("[lobby {}] {} left", session.id(), user);
        let count = self.backend.participant_count(session.id()).await?;
        if session.status() == SessionStatus::ReadyCountdown && count < session.min_players() {
            self.call_off(&session, "not enough players").await?;
        }
        let session = self.refresh(session.id()).await?;
        self.broadcast_update(&session).await?;
        Ok(())
    }

    /// Host-only LOBBY → READY_COUNTDOWN.
    pub async fn initiate_countdown(
        &self,
        caller: ID<UserProfile>,
        code: &str,
    ) -> Result<(), LobbyError> {
        let session = self.lobby_by_code(code).await?;
        if session.host() != Some(caller) {
            return Err(LobbyError::NotHost);
        }
        if session.status() != SessionStatus::Lobby {
            return Err(LobbyError::Closed);
        }
        let count = self.backend.participant_count(session.id()).await?;
        if count < session.min_players() {
            return Err(LobbyError::TooFewPlayers);
        }
        let now = Utc::now();
        if !self.backend.begin_countdown(session.id(), now).await? {
            return Err(LobbyError::Closed);
        }
        if let Err(e) = self
            .backend
            .schedule_countdown(session.id(), self.cfg.countdown())
            .await
        {
            // roll back rather than strand the lobby in READY_COUNTDOWN
            let _ = self.backend.cancel_countdown(session.id()).await;
            log::error!("[lobby {}] countdown job failed: {}", session.id(), e);
            return Err(e);
        }
        log::info!("[lobby {}] countdown started by {}", session.id(), caller);
        self.backend
            .emit_to_room(
                session.id(),
                LOBBY_COUNTDOWN_STARTED,
                json!({
                    "duration": self.cfg.countdown_secs,
                    "startedAt": now.to_rfc3339(),
                }),
            )
            .await;
        Ok(())
    }

    /// Host-only READY_COUNTDOWN → LOBBY.
    pub async fn cancel_countdown(
        &self,
        caller: ID<UserProfile>,
        code: &str,
    ) -> Result<(), LobbyError> {
        let session = self.lobby_by_code(code).await?;
        if session.host() != Some(caller) {
            return Err(LobbyError::NotHost);
        }
        if session.status() != SessionStatus::ReadyCountdown {
            return Err(LobbyError::NoCountdown);
        }
        self.call_off(&session, "cancelled by host").await?;
        let session = self.refresh(session.id()).await?;
        self.broadcast_update(&session).await?;
        Ok(())
    }

    /// Countdown job delivery. Re-validates the minimum, then activates
    /// and hands the session to the engine. Stale firings (countdown
    /// already cancelled, lobby gone) drop silently.
    pub async fn on_countdown_elapsed(&self, session: ID<Session>) {
        let record = match self.backend.session(session).await {
            Ok(Some(record)) if record.status() == SessionStatus::ReadyCountdown => record,
            Ok(_) => {
                log::debug!("[lobby {}] stale countdown firing dropped", session);
                return;
            }
            Err(e) => {
                log::error!("[lobby {}] countdown lookup failed: {}", session, e);
                return;
            }
        };
        let count = match self.backend.participant_count(session).await {
            Ok(count) => count,
            Err(e) => {
                log::error!("[lobby {}] count lookup failed: {}", session, e);
                return;
            }
        };
        if count < record.min_players() {
            if let Err(e) = self.call_off(&record, "not enough players").await {
                log::error!("[lobby {}] auto-cancel failed: {}", session, e);
            }
            return;
        }
        if let Err(e) = self.backend.activate(session).await {
            log::error!("[lobby {}] activation failed: {}", session, e);
            return;
        }
        log::info!("[lobby {}] countdown elapsed, starting game", session);
        self.backend.start_group_game(session).await;
    }

    /// Cancels a running countdown: pending job removed, room told why.
    async fn call_off(&self, session: &Session, reason: &str) -> Result<(), LobbyError> {
        self.backend.cancel_countdown(session.id()).await?;
        if let Err(e) = self.backend.cancel_countdown_job(session.id()).await {
            log::error!("[lobby {}] countdown cancel failed: {}", session.id(), e);
        }
        log::info!("[lobby {}] countdown cancelled: {}", session.id(), reason);
        self.backend
            .emit_to_room(
                session.id(),
                LOBBY_COUNTDOWN_CANCELLED,
                json!({ "reason": reason }),
            )
            .await;
        Ok(())
    }

    /// Full dissolution: participants deleted, session CANCELLED, any
    /// pending countdown job removed.
    async fn dissolve(&self, session: &Session, reason: &str) -> Result<(), LobbyError> {
        if session.status() == SessionStatus::ReadyCountdown {
            if let Err(e) = self.backend.cancel_countdown_job(session.id()).await {
                log::error!("[lobby {}] countdown cancel failed: {}", session.id(), e);
            }
        }
        self.backend.dissolve(session.id()).await?;
        log::info!("[lobby {}] dissolved: {}", session.id(), reason);
        self.backend
            .emit_to_room(session.id(), LOBBY_DISSOLVED, json!({ "reason": reason }))
            .await;
        Ok(())
    }

    async fn lobby_by_code(&self, code: &str) -> Result<Session, LobbyError> {
        self.backend
            .session_by_code(code)
            .await?
            .filter(|s| s.status().is_joinable_lobby())
            .ok_or(LobbyError::UnknownCode)
    }

    async fn refresh(&self, session: ID<Session>) -> Result<Session, LobbyError> {
        self.backend
            .session(session)
            .await?
            .ok_or(LobbyError::Closed)
    }

    async fn broadcast_update(&self, session: &Session) -> Result<(), LobbyError> {
        let roster = self.backend.roster(session.id()).await?;
        self.backend
            .emit_to_room(session.id(), LOBBY_UPDATE, projection(session, &roster))
            .await;
        Ok(())
    }
}

/// lobby-countdown queue handler: parse and route to the controller.
pub struct CountdownHandler(pub Arc<LobbyController>);

#[async_trait::async_trait]
impl qz_timers::JobHandler for CountdownHandler {
    async fn handle(&self, payload: &str) {
        match serde_json::from_str::<qz_timers::LobbyCountdown>(payload) {
            Ok(job) => self.0.on_countdown_elapsed(job.session_id).await,
            Err(e) => log::warn!("[lobby] unparseable countdown job dropped: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use qz_core::Mode;
    use qz_store::Enrolled;
    use qz_store::Participant;
    use serde_json::Value;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Row {
        id: ID<Session>,
        code: Option<String>,
        status: SessionStatus,
        tier: Tier,
        duration_minutes: u32,
        host: ID<UserProfile>,
        min_players: usize,
        max_players: usize,
        countdown_started_at: Option<DateTime<Utc>>,
        members: Vec<ID<UserProfile>>,
    }

    /// Single-lobby in-memory backend recording every side effect the
    /// state machine asks for.
    #[derive(Default)]
    struct MemoryBackend {
        row: Mutex<Option<Row>>,
        emitted: Mutex<Vec<String>>,
        scheduled_jobs: Mutex<usize>,
        cancelled_jobs: Mutex<usize>,
        started_games: Mutex<Vec<ID<Session>>>,
    }

    fn synthesize(row: &Row) -> Session {
        Session::new(
            row.id,
            Mode::GroupPlay,
            row.status,
            row.tier,
            row.duration_minutes,
            row.code.clone(),
            Some(row.host),
            row.min_players,
            row.max_players,
            row.countdown_started_at,
        )
    }

    #[async_trait::async_trait]
    impl Backend for MemoryBackend {
        async fn session(&self, id: ID<Session>) -> Result<Option<Session>, LobbyError> {
            Ok(self
                .row
                .lock()
                .unwrap()
                .as_ref()
                .filter(|r| r.id == id)
                .map(synthesize))
        }
        async fn session_by_code(&self, code: &str) -> Result<Option<Session>, LobbyError> {
            Ok(self
                .row
                .lock()
                .unwrap()
                .as_ref()
                .filter(|r| r.code.as_deref() == Some(code))
                .map(synthesize))
        }
        async fn code_in_use(&self, code: &str) -> Result<bool, LobbyError> {
            Ok(self
                .row
                .lock()
                .unwrap()
                .as_ref()
                .is_some_and(|r| r.code.as_deref() == Some(code)))
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
            let row = Row {
                id: ID::default(),
                code: Some(code.to_string()),
                status: SessionStatus::Lobby,
                tier,
                duration_minutes,
                host,
                min_players,
                max_players,
                countdown_started_at: None,
                members: vec![host],
            };
            let session = synthesize(&row);
            *self.row.lock().unwrap() = Some(row);
            Ok(Some(session))
        }
        async fn join(
            &self,
            session: ID<Session>,
            user: ID<UserProfile>,
        ) -> Result<Option<Participant>, LobbyError> {
            let mut guard = self.row.lock().unwrap();
            let Some(row) = guard.as_mut().filter(|r| r.id == session) else {
                return Ok(None);
            };
            if row.members.contains(&user) {
                return Err(LobbyError::Duplicate);
            }
            if row.status != SessionStatus::Lobby || row.members.len() >= row.max_players {
                return Ok(None);
            }
            row.members.push(user);
            Ok(Some(Participant::new(ID::default(), session, user, false)))
        }
        async fn leave(
            &self,
            session: ID<Session>,
            user: ID<UserProfile>,
        ) -> Result<Option<ID<Participant>>, LobbyError> {
            let mut guard = self.row.lock().unwrap();
            let Some(row) = guard.as_mut().filter(|r| r.id == session) else {
                return Ok(None);
            };
            let before = row.members.len();
            row.members.retain(|m| *m != user);
            Ok((row.members.len() < before).then(ID::default))
        }
        async fn participant_count(&self, session: ID<Session>) -> Result<usize, LobbyError> {
            Ok(self
                .row
                .lock()
                .unwrap()
                .as_ref()
                .filter(|r| r.id == session)
                .map(|r| r.members.len())
                .unwrap_or(0))
        }
        async fn roster(&self, session: ID<Session>) -> Result<Vec<Enrolled>, LobbyError> {
            Ok(self
                .row
                .lock()
                .unwrap()
                .as_ref()
                .filter(|r| r.id == session)
                .map(|r| {
                    r.members
                        .iter()
                        .enumerate()
                        .map(|(i, user)| Enrolled {
                            participant: ID::default(),
                            user: *user,
                            username: format!("user-{}", i),
                            is_bot: false,
                            rating: 1200,
                        })
                        .collect()
                })
                .unwrap_or_default())
        }
        async fn begin_countdown(
            &self,
            session: ID<Session>,
            at: DateTime<Utc>,
        ) -> Result<bool, LobbyError> {
            let mut guard = self.row.lock().unwrap();
            let Some(row) = guard
                .as_mut()
                .filter(|r| r.id == session && r.status == SessionStatus::Lobby)
            else {
                return Ok(false);
            };
            row.status = SessionStatus::ReadyCountdown;
            row.countdown_started_at = Some(at);
            Ok(true)
        }
        async fn cancel_countdown(&self, session: ID<Session>) -> Result<bool, LobbyError> {
            let mut guard = self.row.lock().unwrap();
            let Some(row) = guard
                .as_mut()
                .filter(|r| r.id == session && r.status == SessionStatus::ReadyCountdown)
            else {
                return Ok(false);
            };
            row.status = SessionStatus::Lobby;
            row.countdown_started_at = None;
            Ok(true)
        }
        async fn activate(&self, session: ID<Session>) -> Result<bool, LobbyError> {
            let mut guard = self.row.lock().unwrap();
            let Some(row) = guard
                .as_mut()
                .filter(|r| r.id == session && r.status == SessionStatus::ReadyCountdown)
            else {
                return Ok(false);
            };
            row.status = SessionStatus::Active;
            row.code = None;
            row.countdown_started_at = None;
            Ok(true)
        }
        async fn dissolve(&self, session: ID<Session>) -> Result<bool, LobbyError> {
            let mut guard = self.row.lock().unwrap();
            let Some(row) = guard
                .as_mut()
                .filter(|r| r.id == session && r.status.is_joinable_lobby())
            else {
                return Ok(false);
            };
            row.members.clear();
            row.status = SessionStatus::Cancelled;
            row.code = None;
            row.countdown_started_at = None;
            Ok(true)
        }
        async fn schedule_countdown(
            &self,
            _session: ID<Session>,
            _delay: Duration,
        ) -> Result<(), LobbyError> {
            *self.scheduled_jobs.lock().unwrap() += 1;
            Ok(())
        }
        async fn cancel_countdown_job(&self, _session: ID<Session>) -> Result<(), LobbyError> {
            *self.cancelled_jobs.lock().unwrap() += 1;
            Ok(())
        }
        async fn emit_to_room(&self, _session: ID<Session>, event: &str, _payload: Value) {
            self.emitted.lock().unwrap().push(event.to_string());
        }
        async fn start_group_game(&self, session: ID<Session>) {
            self.started_games.lock().unwrap().push(session);
        }
    }

    fn harness() -> (Arc<LobbyController>, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::default());
        let controller = LobbyController::new(Config::default(), backend.clone());
        (controller, backend)
    }

    async fn countdown_lobby(
        controller: &LobbyController,
        backend: &MemoryBackend,
    ) -> (ID<UserProfile>, ID<UserProfile>, String, ID<Session>) {
        let host = ID::default();
        let guest = ID::default();
        let session = controller
            .create_lobby(host, Tier::Easy, 5, 4)
            .await
            .unwrap();
        let code = session.room_code().unwrap().to_string();
        controller.join(guest, &code).await.unwrap();
        controller.initiate_countdown(host, &code).await.unwrap();
        assert_eq!(*backend.scheduled_jobs.lock().unwrap(), 1);
        (host, guest, code, session.id())
    }

    #[tokio::test]
    async fn host_leaving_mid_countdown_dissolves_the_lobby() {
        let (controller, backend) = harness();
        let (host, _guest, code, _session) = countdown_lobby(&controller, &backend).await;

        controller.leave(host, &code).await.unwrap();

        assert_eq!(*backend.cancelled_jobs.lock().unwrap(), 1);
        assert!(backend
            .emitted
            .lock()
            .unwrap()
            .contains(&LOBBY_DISSOLVED.to_string()));
        let guard = backend.row.lock().unwrap();
        let row = guard.as_ref().unwrap();
        assert_eq!(row.status, SessionStatus::Cancelled);
        assert!(row.members.is_empty());
        assert!(row.code.is_none());
    }

    #[tokio::test]
    async fn join_after_countdown_starts_is_rejected() {
        let (controller, backend) = harness();
        let (_host, _guest, code, _session) = countdown_lobby(&controller, &backend).await;

        let latecomer = ID::default();
        let rejected = controller.join(latecomer, &code).await.unwrap_err();
        assert!(matches!(rejected, LobbyError::Closed));
        let guard = backend.row.lock().unwrap();
        let row = guard.as_ref().unwrap();
        assert_eq!(row.members.len(), 2, "membership unchanged");
        assert_eq!(row.status, SessionStatus::ReadyCountdown);
    }

    #[tokio::test]
    async fn cancelling_the_countdown_prevents_activation() {
        let (controller, backend) = harness();
        let (host, _guest, code, session) = countdown_lobby(&controller, &backend).await;

        controller.cancel_countdown(host, &code).await.unwrap();
        assert_eq!(*backend.cancelled_jobs.lock().unwrap(), 1);
        assert!(backend
            .emitted
            .lock()
            .unwrap()
            .contains(&LOBBY_COUNTDOWN_CANCELLED.to_string()));

        // the job may still fire once after cancellation; it must drop
        controller.on_countdown_elapsed(session).await;
        assert!(backend.started_games.lock().unwrap().is_empty());
        let guard = backend.row.lock().unwrap();
        assert_eq!(guard.as_ref().unwrap().status, SessionStatus::Lobby);
    }

    #[tokio::test]
    async fn guest_leave_below_minimum_cancels_countdown() {
        let (controller, backend) = harness();
        let (_host, guest, code, _session) = countdown_lobby(&controller, &backend).await;

        controller.leave(guest, &code).await.unwrap();

        assert_eq!(*backend.cancelled_jobs.lock().unwrap(), 1);
        assert!(backend
            .emitted
            .lock()
            .unwrap()
            .contains(&LOBBY_COUNTDOWN_CANCELLED.to_string()));
        let guard = backend.row.lock().unwrap();
        assert_eq!(guard.as_ref().unwrap().status, SessionStatus::Lobby);
    }

    #[tokio::test]
    async fn elapsed_countdown_activates_and_hands_off() {
        let (controller, backend) = harness();
        let (_host, _guest, _code, session) = countdown_lobby(&controller, &backend).await;

        controller.on_countdown_elapsed(session).await;

        assert_eq!(*backend.started_games.lock().unwrap(), vec![session]);
        let guard = backend.row.lock().unwrap();
        let row = guard.as_ref().unwrap();
        assert_eq!(row.status, SessionStatus::Active);
        assert!(row.code.is_none(), "active sessions are not code-addressable");
    }
}
