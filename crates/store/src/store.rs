use super::*;
use chrono::DateTime;
use chrono::Utc;
use const_format::concatcp;
use qz_core::ID;
use qz_core::Mode;
use qz_core::Rating;
use qz_core::Score;
use qz_core::Tier;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_postgres::Client;
use uuid::Uuid;

/// Atomic mutations over sessions, participants, and ratings.
/// Every method is a single SQL statement (data-modifying CTEs where a call
/// touches more than one table), so each call commits or fails as a unit
/// on the shared connection.
#[derive(Clone)]
pub struct SessionStore {
    db: Arc<Client>,
}

impl SessionStore {
    pub fn new(db: Arc<Client>) -> Self {
        Self { db }
    }

    /// Provisions a WAITING session with one participant per user plus
    /// `bot_count` synthesized bot opponents. Bot identities are fresh
    /// user rows carrying the configured default rating.
    ///
    /// An unknown user id fails the whole call (foreign-key violation);
    /// a duplicate user in `users` fails it too (unique violation).
    pub async fn create(
        &self,
        users: &[ID<UserProfile>],
        bot_count: usize,
        mode: Mode,
        tier: Tier,
        duration_minutes: u32,
        bot_rating: Rating,
    ) -> Result<(ID<Session>, Vec<Participant>), PgErr> {
        const SQL: &str = concatcp!(
            "WITH s AS (
                INSERT INTO ",
            SESSIONS,
            " (id, mode, status, tier, duration_minutes)
                VALUES ($1, $2, 'WAITING', $3, $4)
            ), b AS (
                INSERT INTO ",
            USERS,
            " (id, username, rating)
                SELECT * FROM unnest($5::uuid[], $6::text[], $7::int4[])
            )
            INSERT INTO ",
            PARTICIPANTS,
            " (id, session_id, user_id, is_bot)
            SELECT t.pid, $1, t.uid, t.bot
            FROM unnest($8::uuid[], $9::uuid[], $10::bool[]) AS t(pid, uid, bot)
            RETURNING id, session_id, user_id, is_bot, final_score"
        );
        let session = ID::<Session>::default();
        let bots = (0..bot_count).map(|_| bot_identity()).collect::<Vec<_>>();
        let bot_ids = bots.iter().map(|(id, _)| *id).collect::<Vec<Uuid>>();
        let bot_names = bots.into_iter().map(|(_, name)| name).collect::<Vec<_>>();
        let bot_ratings = vec![bot_rating; bot_ids.len()];
        let pids = users
            .iter()
            .map(|_| Uuid::now_v7())
            .chain(bot_ids.iter().map(|_| Uuid::now_v7()))
            .collect::<Vec<_>>();
        let uids = users
            .iter()
            .map(|u| u.uuid())
            .chain(bot_ids.iter().copied())
            .collect::<Vec<_>>();
        let flags = users
            .iter()
            .map(|_| false)
            .chain(bot_ids.iter().map(|_| true))
            .collect::<Vec<_>>();
        let rows = self
            .db
            .query(
                SQL,
                &[
                    &session.uuid(),
                    &mode.as_str(),
                    &tier.as_str(),
                    &(duration_minutes as i16),
                    &bot_ids,
                    &bot_names,
                    &bot_ratings,
                    &pids,
                    &uids,
                    &flags,
                ],
            )
            .await?;
        let participants = rows
            .iter()
            .map(Participant::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        log::info!(
            "[store] created session {} ({}, {} participants)",
            session,
            mode,
            participants.len()
        );
        Ok((session, participants))
    }

    /// Provisions a GROUP_PLAY lobby with the host seated atomically.
    /// Fails with a unique violation when the room code is already live.
    pub async fn create_lobby(
        &self,
        host: ID<UserProfile>,
        tier: Tier,
        duration_minutes: u32,
        min_players: usize,
        max_players: usize,
        code: &str,
    ) -> Result<Session, PgErr> {
        const SQL: &str = concatcp!(
            "WITH s AS (
                INSERT INTO ",
            SESSIONS,
            " (id, mode, status, tier, duration_minutes, room_code, host_id, min_players, max_players)
                VALUES ($1, 'GROUP_PLAY', 'LOBBY', $2, $3, $4, $5, $6, $7)
                RETURNING *
            ), p AS (
                INSERT INTO ",
            PARTICIPANTS,
            " (id, session_id, user_id, is_bot) VALUES ($8, $1, $5, FALSE)
            )
            SELECT * FROM s"
        );
        let session = ID::<Session>::default();
        let row = self
            .db
            .query_one(
                SQL,
                &[
                    &session.uuid(),
                    &tier.as_str(),
                    &(duration_minutes as i16),
                    &code,
                    &host.uuid(),
                    &(min_players as i16),
                    &(max_players as i16),
                    &Uuid::now_v7(),
                ],
            )
            .await?;
        Session::from_row(&row)
    }

    pub async fn session(&self, id: ID<Session>) -> Result<Option<Session>, PgErr> {
        const SQL: &str = concatcp!("SELECT * FROM ", SESSIONS, " WHERE id = $1");
        self.db
            .query_opt(SQL, &[&id.uuid()])
            .await?
            .as_ref()
            .map(Session::from_row)
            .transpose()
    }

    pub async fn session_by_code(&self, code: &str) -> Result<Option<Session>, PgErr> {
        const SQL: &str = concatcp!("SELECT * FROM ", SESSIONS, " WHERE room_code = $1");
        self.db
            .query_opt(SQL, &[&code])
            .await?
            .as_ref()
            .map(Session::from_row)
            .transpose()
    }

    /// True while `code` addresses a live lobby. Used for rejection
    /// resampling when generating fresh codes.
    pub async fn code_in_use(&self, code: &str) -> Result<bool, PgErr> {
        const SQL: &str = concatcp!("SELECT 1 FROM ", SESSIONS, " WHERE room_code = $1");
        Ok(self.db.query_opt(SQL, &[&code]).await?.is_some())
    }

    pub async fn participants(&self, session: ID<Session>) -> Result<Vec<Participant>, PgErr> {
        const SQL: &str = concatcp!(
            "SELECT * FROM ",
            PARTICIPANTS,
            " WHERE session_id = $1 ORDER BY id"
        );
        self.db
            .query(SQL, &[&session.uuid()])
            .await?
            .iter()
            .map(Participant::from_row)
            .collect()
    }

    /// Participants joined with their user profiles, in seat order.
    pub async fn roster(&self, session: ID<Session>) -> Result<Vec<Enrolled>, PgErr> {
        const SQL: &str = concatcp!(
            "SELECT p.id, p.user_id, p.is_bot, u.username, u.rating
             FROM ",
            PARTICIPANTS,
            " p JOIN ",
            USERS,
            " u ON u.id = p.user_id
             WHERE p.session_id = $1 ORDER BY p.id"
        );
        self.db
            .query(SQL, &[&session.uuid()])
            .await?
            .iter()
            .map(Enrolled::from_row)
            .collect()
    }

    /// Seats a user in a lobby, guarded against capacity and status in the
    /// same statement. Returns None when the lobby is full or no longer
    /// joinable; surfaces a unique violation for duplicate users.
    pub async fn join(
        &self,
        session: ID<Session>,
        user: ID<UserProfile>,
    ) -> Result<Option<Participant>, PgErr> {
        const SQL: &str = concatcp!(
            "INSERT INTO ",
            PARTICIPANTS,
            " (id, session_id, user_id, is_bot)
             SELECT $1, $2, $3, FALSE
             WHERE (SELECT count(*) FROM ",
            PARTICIPANTS,
            " WHERE session_id = $2) < (SELECT max_players FROM ",
            SESSIONS,
            " WHERE id = $2)
               AND (SELECT status FROM ",
            SESSIONS,
            " WHERE id = $2) = 'LOBBY'
             RETURNING id, session_id, user_id, is_bot, final_score"
        );
        self.db
            .query_opt(SQL, &[&Uuid::now_v7(), &session.uuid(), &user.uuid()])
            .await?
            .as_ref()
            .map(Participant::from_row)
            .transpose()
    }

    /// Removes a user's participant row. Returns the removed participant
    /// id, or None when the user was not seated.
    pub async fn leave(
        &self,
        session: ID<Session>,
        user: ID<UserProfile>,
    ) -> Result<Option<ID<Participant>>, PgErr> {
        const SQL: &str = concatcp!(
            "DELETE FROM ",
            PARTICIPANTS,
            " WHERE session_id = $1 AND user_id = $2 RETURNING id"
        );
        Ok(self
            .db
            .query_opt(SQL, &[&session.uuid(), &user.uuid()])
            .await?
            .map(|row| ID::from(row.get::<_, Uuid>("id"))))
    }

    pub async fn participant_count(&self, session: ID<Session>) -> Result<usize, PgErr> {
        const SQL: &str = concatcp!(
            "SELECT count(*) FROM ",
            PARTICIPANTS,
            " WHERE session_id = $1"
        );
        let row = self.db.query_one(SQL, &[&session.uuid()]).await?;
        Ok(row.get::<_, i64>(0) as usize)
    }

    /// LOBBY → READY_COUNTDOWN. Returns false when the lobby is not in a
    /// state that can start a countdown.
    pub async fn begin_countdown(
        &self,
        session: ID<Session>,
        at: DateTime<Utc>,
    ) -> Result<bool, PgErr> {
        const SQL: &str = concatcp!(
            "UPDATE ",
            SESSIONS,
            " SET status = 'READY_COUNTDOWN', countdown_started_at = $2
             WHERE id = $1 AND status = 'LOBBY'"
        );
        Ok(self.db.execute(SQL, &[&session.uuid(), &at]).await? == 1)
    }

    /// READY_COUNTDOWN → LOBBY.
    pub async fn cancel_countdown(&self, session: ID<Session>) -> Result<bool, PgErr> {
        const SQL: &str = concatcp!(
            "UPDATE ",
            SESSIONS,
            " SET status = 'LOBBY', countdown_started_at = NULL
             WHERE id = $1 AND status = 'READY_COUNTDOWN'"
        );
        Ok(self.db.execute(SQL, &[&session.uuid()]).await? == 1)
    }

    /// Transitions to ACTIVE and clears the room code, so the session is
    /// no longer addressable by code from the moment play starts.
    pub async fn activate(&self, session: ID<Session>) -> Result<bool, PgErr> {
        const SQL: &str = concatcp!(
            "UPDATE ",
            SESSIONS,
            " SET status = 'ACTIVE', room_code = NULL, countdown_started_at = NULL
             WHERE id = $1 AND status IN ('WAITING', 'READY_COUNTDOWN')"
        );
        Ok(self.db.execute(SQL, &[&session.uuid()]).await? == 1)
    }

    /// Terminal CANCELLED transition; a no-op for already-terminal rows.
    pub async fn cancel(&self, session: ID<Session>) -> Result<bool, PgErr> {
        const SQL: &str = concatcp!(
            "UPDATE ",
            SESSIONS,
            " SET status = 'CANCELLED', room_code = NULL, countdown_started_at = NULL,
                   finished_at = now()
             WHERE id = $1 AND status NOT IN ('FINISHED', 'CANCELLED')"
        );
        Ok(self.db.execute(SQL, &[&session.uuid()]).await? == 1)
    }

    /// Terminal FINISHED transition persisting per-participant final
    /// scores. Idempotent: a second call finds no non-terminal session row
    /// and updates nothing.
    pub async fn end(
        &self,
        session: ID<Session>,
        scores: &[(ID<Participant>, Score)],
    ) -> Result<(), PgErr> {
        const SQL: &str = concatcp!(
            "WITH s AS (
                UPDATE ",
            SESSIONS,
            " SET status = 'FINISHED', finished_at = now(), room_code = NULL
                WHERE id = $1 AND status NOT IN ('FINISHED', 'CANCELLED')
                RETURNING id
            )
            UPDATE ",
            PARTICIPANTS,
            " p SET final_score = v.score
            FROM unnest($2::uuid[], $3::int4[]) AS v(pid, score), s
            WHERE p.id = v.pid AND p.session_id = s.id"
        );
        let pids = scores.iter().map(|(p, _)| p.uuid()).collect::<Vec<_>>();
        let points = scores.iter().map(|(_, s)| *s).collect::<Vec<_>>();
        self.db
            .execute(SQL, &[&session.uuid(), &pids, &points])
            .await?;
        Ok(())
    }

    /// Full lobby dissolution: participants deleted, session CANCELLED.
    /// Only legal before the session goes ACTIVE.
    pub async fn dissolve(&self, session: ID<Session>) -> Result<bool, PgErr> {
        const SQL: &str = concatcp!(
            "WITH d AS (
                DELETE FROM ",
            PARTICIPANTS,
            " WHERE session_id = $1
            )
            UPDATE ",
            SESSIONS,
            " SET status = 'CANCELLED', room_code = NULL, countdown_started_at = NULL,
                   finished_at = now()
             WHERE id = $1 AND status IN ('LOBBY', 'READY_COUNTDOWN')"
        );
        Ok(self.db.execute(SQL, &[&session.uuid()]).await? == 1)
    }

    pub async fn ratings(
        &self,
        users: &[ID<UserProfile>],
    ) -> Result<HashMap<ID<UserProfile>, Rating>, PgErr> {
        const SQL: &str = concatcp!("SELECT id, rating FROM ", USERS, " WHERE id = ANY($1)");
        let uids = users.iter().map(|u| u.uuid()).collect::<Vec<_>>();
        Ok(self
            .db
            .query(SQL, &[&uids])
            .await?
            .iter()
            .map(|row| (ID::from(row.get::<_, Uuid>("id")), row.get("rating")))
            .collect())
    }

    /// Writes both sides of a rating update in one statement, so the
    /// zero-sum invariant cannot be broken by a partial failure.
    pub async fn apply_ratings(
        &self,
        a: (ID<UserProfile>, Rating),
        b: (ID<UserProfile>, Rating),
    ) -> Result<(), PgErr> {
        const SQL: &str = concatcp!(
            "UPDATE ",
            USERS,
            " SET rating = CASE id WHEN $1 THEN $2 WHEN $3 THEN $4 END
             WHERE id IN ($1, $3)"
        );
        self.db
            .execute(SQL, &[&a.0.uuid(), &a.1, &b.0.uuid(), &b.1])
            .await?;
        log::info!("[store] ratings applied: {} -> {}, {} -> {}", a.0, a.1, b.0, b.1);
        Ok(())
    }
}

/// Fresh bot identity: id plus a display name derived from it, so the
/// name is stable for the lifetime of the bot row.
fn bot_identity() -> (Uuid, String) {
    let id = Uuid::now_v7();
    let name = format!("QuizBot-{}", &id.simple().to_string()[..6]);
    (id, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn bot_identities_are_distinct_and_named_from_id() {
        let (a, name_a) = bot_identity();
        let (b, name_b) = bot_identity();
        assert_ne!(a, b);
        assert_ne!(name_a, name_b);
        assert!(name_a.starts_with("QuizBot-"));
        assert_eq!(name_a, format!("QuizBot-{}", &a.simple().to_string()[..6]));
    }
    #[test]
    fn ddl_references_dependencies() {
        assert!(Session::creates().contains(USERS));
        assert!(Participant::creates().contains(SESSIONS));
        assert!(Participant::creates().contains("UNIQUE (session_id, user_id)"));
    }
}
