use super::*;
use chrono::DateTime;
use chrono::Utc;
use qz_core::ID;
use qz_core::Rating;
use qz_core::Unique;

/// Rating ledger row for a human or a synthesized bot opponent.
/// Identity and authentication live outside the core; this row exists so
/// rating lookups and roster joins are uniform across humans and bots.
#[derive(Debug, Clone)]
pub struct UserProfile {
    id: ID<Self>,
    username: String,
    rating: Rating,
    created_at: DateTime<Utc>,
}

impl Unique for UserProfile {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

impl UserProfile {
    pub fn new(id: ID<Self>, username: String, rating: Rating) -> Self {
        Self {
            id,
            username,
            rating,
            created_at: Utc::now(),
        }
    }
    pub fn username(&self) -> &str {
        &self.username
    }
    pub fn rating(&self) -> Rating {
        self.rating
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Schema for UserProfile {
    fn name() -> &'static str {
        USERS
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            USERS,
            " (
                id          UUID PRIMARY KEY,
                username    TEXT NOT NULL,
                rating      INTEGER NOT NULL DEFAULT 1200,
                created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
            );"
        )
    }
    fn indices() -> &'static str {
        ""
    }
}
