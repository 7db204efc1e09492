//! Durable storage for sessions, participants, and user profiles.
//!
//! This crate is the source of truth for game identity. Ephemeral game
//! state lives elsewhere and can always be rebuilt from the rows here.
//!
//! ## Connectivity
//!
//! - [`db()`] — Establishes a database connection from `QZ_PG_URL`
//!
//! ## Serialization
//!
//! - [`Schema`] — Table metadata and compile-time DDL generation
//! - [`migrate()`] — Applies DDL for every table owned by the platform
//!
//! ## Records
//!
//! - [`UserProfile`] — Rating ledger row (auth lives outside the core)
//! - [`Session`] — One game instance
//! - [`Participant`] — A user's (or bot's) enrollment in one session
//!
//! ## Store
//!
//! - [`SessionStore`] — Atomic per-call mutations over the records above
mod participant;
mod session;
mod store;
mod traits;
mod user;

pub use participant::*;
pub use session::*;
pub use store::*;
pub use traits::*;
pub use user::*;

use std::sync::Arc;
use tokio_postgres::Client;

/// PostgreSQL error type alias.
pub type PgErr = tokio_postgres::Error;

/// Table for user profiles and ratings.
#[rustfmt::skip]
pub const USERS:        &str = "users";
/// Table for game sessions.
#[rustfmt::skip]
pub const SESSIONS:     &str = "sessions";
/// Table for session membership.
#[rustfmt::skip]
pub const PARTICIPANTS: &str = "participants";
/// Table for quiz questions.
#[rustfmt::skip]
pub const QUESTIONS:    &str = "questions";
/// Table for question answer options.
#[rustfmt::skip]
pub const CHOICES:      &str = "choices";
/// Table for question categories.
#[rustfmt::skip]
pub const CATEGORIES:   &str = "categories";
/// Join table for question category membership.
#[rustfmt::skip]
pub const QUESTION_CATEGORIES: &str = "question_categories";

/// Establishes a database connection.
///
/// Connects to PostgreSQL using the `QZ_PG_URL` environment variable and
/// returns an `Arc<Client>` suitable for sharing across async tasks.
///
/// # Panics
///
/// Panics if `QZ_PG_URL` is not set or if the connection fails.
pub async fn db() -> Arc<Client> {
    log::info!("connecting to database");
    let tls = tokio_postgres::tls::NoTls;
    let ref url = std::env::var("QZ_PG_URL").expect("QZ_PG_URL must be set");
    let (client, connection) = tokio_postgres::connect(url, tls)
        .await
        .expect("database connection failed");
    tokio::spawn(connection);
    client
        .execute("SET client_min_messages TO WARNING", &[])
        .await
        .expect("set client_min_messages");
    Arc::new(client)
}

/// Detects a unique-constraint violation, used to translate duplicate
/// participants and room-code collisions into typed rejections.
pub fn is_unique_violation(e: &PgErr) -> bool {
    e.code() == Some(&tokio_postgres::error::SqlState::UNIQUE_VIOLATION)
}

/// Detects a foreign-key violation, used to surface unknown users as a
/// fatal setup error.
pub fn is_foreign_key_violation(e: &PgErr) -> bool {
    e.code() == Some(&tokio_postgres::error::SqlState::FOREIGN_KEY_VIOLATION)
}
