use super::*;
use qz_core::ID;
use qz_core::Rating;
use qz_core::Score;
use qz_core::Unique;

/// A user's (or bot's) enrollment in exactly one session.
/// The participant id is the identity used in live-state keys and event
/// routing. Within one session a user may appear only once.
#[derive(Debug, Clone)]
pub struct Participant {
    id: ID<Self>,
    session: ID<Session>,
    user: ID<UserProfile>,
    is_bot: bool,
    final_score: Option<Score>,
}

impl Unique for Participant {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

impl Participant {
    pub fn new(id: ID<Self>, session: ID<Session>, user: ID<UserProfile>, is_bot: bool) -> Self {
        Self {
            id,
            session,
            user,
            is_bot,
            final_score: None,
        }
    }
    pub fn session(&self) -> ID<Session> {
        self.session
    }
    pub fn user(&self) -> ID<UserProfile> {
        self.user
    }
    pub fn is_bot(&self) -> bool {
        self.is_bot
    }
    pub fn final_score(&self) -> Option<Score> {
        self.final_score
    }
    pub(crate) fn from_row(row: &tokio_postgres::Row) -> Result<Self, PgErr> {
        Ok(Self {
            id: ID::from(row.try_get::<_, uuid::Uuid>("id")?),
            session: ID::from(row.try_get::<_, uuid::Uuid>("session_id")?),
            user: ID::from(row.try_get::<_, uuid::Uuid>("user_id")?),
            is_bot: row.try_get("is_bot")?,
            final_score: row.try_get("final_score")?,
        })
    }
}

/// Roster row: a participant joined with its user profile.
/// What the engine needs to route events and simulate opponents.
#[derive(Debug, Clone)]
pub struct Enrolled {
    pub participant: ID<Participant>,
    pub user: ID<UserProfile>,
    pub username: String,
    pub is_bot: bool,
    pub rating: Rating,
}

impl Enrolled {
    pub(crate) fn from_row(row: &tokio_postgres::Row) -> Result<Self, PgErr> {
        Ok(Self {
            participant: ID::from(row.try_get::<_, uuid::Uuid>("id")?),
            user: ID::from(row.try_get::<_, uuid::Uuid>("user_id")?),
            username: row.try_get("username")?,
            is_bot: row.try_get("is_bot")?,
            rating: row.try_get("rating")?,
        })
    }
}

impl Schema for Participant {
    fn name() -> &'static str {
        PARTICIPANTS
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            PARTICIPANTS,
            " (
                id           UUID PRIMARY KEY,
                session_id   UUID NOT NULL REFERENCES ",
            SESSIONS,
            "(id) ON DELETE CASCADE,
                user_id      UUID NOT NULL REFERENCES ",
            USERS,
            "(id),
                is_bot       BOOLEAN NOT NULL DEFAULT FALSE,
                final_score  INTEGER,
                UNIQUE (session_id, user_id)
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_participants_session ON ",
            PARTICIPANTS,
            " (session_id);"
        )
    }
}
