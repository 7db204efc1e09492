use super::*;
use chrono::DateTime;
use chrono::Utc;
use qz_core::ID;
use qz_core::Mode;
use qz_core::SessionStatus;
use qz_core::Tier;
use qz_core::Unique;

/// One game instance.
/// Root unit of play: participants, live state, timer jobs, and events all
/// hang off this id. Terminal statuses are FINISHED and CANCELLED.
///
/// Invariant: `room_code` is present exactly when the mode is GROUP_PLAY
/// and the status is LOBBY or READY_COUNTDOWN. The store clears the code
/// on activation and cancellation to maintain this.
#[derive(Debug, Clone)]
pub struct Session {
    id: ID<Self>,
    mode: Mode,
    status: SessionStatus,
    tier: Tier,
    duration_minutes: u32,
    room_code: Option<String>,
    host: Option<ID<UserProfile>>,
    min_players: usize,
    max_players: usize,
    countdown_started_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Unique for Session {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ID<Self>,
        mode: Mode,
        status: SessionStatus,
        tier: Tier,
        duration_minutes: u32,
        room_code: Option<String>,
        host: Option<ID<UserProfile>>,
        min_players: usize,
        max_players: usize,
        countdown_started_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            mode,
            status,
            tier,
            duration_minutes,
            room_code,
            host,
            min_players,
            max_players,
            countdown_started_at,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
    pub fn mode(&self) -> Mode {
        self.mode
    }
    pub fn status(&self) -> SessionStatus {
        self.status
    }
    pub fn tier(&self) -> Tier {
        self.tier
    }
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }
    pub fn room_code(&self) -> Option<&str> {
        self.room_code.as_deref()
    }
    pub fn host(&self) -> Option<ID<UserProfile>> {
        self.host
    }
    pub fn min_players(&self) -> usize {
        self.min_players
    }
    pub fn max_players(&self) -> usize {
        self.max_players
    }
    pub fn countdown_started_at(&self) -> Option<DateTime<Utc>> {
        self.countdown_started_at
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
    /// Hydrates a session from a `SELECT *` row in column order.
    pub(crate) fn from_row(row: &tokio_postgres::Row) -> Result<Self, PgErr> {
        Ok(Self {
            id: ID::from(row.try_get::<_, uuid::Uuid>("id")?),
            mode: row
                .try_get::<_, String>("mode")?
                .parse()
                .expect("mode column holds a known mode"),
            status: row
                .try_get::<_, String>("status")?
                .parse()
                .expect("status column holds a known status"),
            tier: row
                .try_get::<_, String>("tier")?
                .parse()
                .expect("tier column holds a known tier"),
            duration_minutes: row.try_get::<_, i16>("duration_minutes")? as u32,
            room_code: row.try_get("room_code")?,
            host: row
                .try_get::<_, Option<uuid::Uuid>>("host_id")?
                .map(ID::from),
            min_players: row.try_get::<_, i16>("min_players")? as usize,
            max_players: row.try_get::<_, i16>("max_players")? as usize,
            countdown_started_at: row.try_get("countdown_started_at")?,
            created_at: row.try_get("created_at")?,
            finished_at: row.try_get("finished_at")?,
        })
    }
}

impl Schema for Session {
    fn name() -> &'static str {
        SESSIONS
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            SESSIONS,
            " (
                id                    UUID PRIMARY KEY,
                mode                  TEXT NOT NULL,
                status                TEXT NOT NULL,
                tier                  TEXT NOT NULL,
                duration_minutes      SMALLINT NOT NULL,
                room_code             TEXT,
                host_id               UUID REFERENCES ",
            USERS,
            "(id),
                min_players           SMALLINT NOT NULL DEFAULT 2,
                max_players           SMALLINT NOT NULL DEFAULT 8,
                countdown_started_at  TIMESTAMPTZ,
                created_at            TIMESTAMPTZ NOT NULL DEFAULT now(),
                finished_at           TIMESTAMPTZ
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_room_code ON ",
            SESSIONS,
            " (room_code) WHERE room_code IS NOT NULL;
             CREATE INDEX IF NOT EXISTS idx_sessions_status ON ",
            SESSIONS,
            " (status);"
        )
    }
}
