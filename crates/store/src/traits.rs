//! PostgreSQL schema traits.
use std::sync::Arc;
use tokio_postgres::Client;

/// Schema metadata for PostgreSQL tables.
///
/// Provides compile-time SQL generation for table creation and indexing.
/// All methods return `&'static str`, assembled with
/// [`const_format::concatcp!`] from the table-name constants in the crate
/// root. The trait contains no I/O; [`migrate`] applies the DDL.
pub trait Schema {
    /// Returns the table name in the database.
    fn name() -> &'static str;
    /// Returns the `CREATE TABLE IF NOT EXISTS` DDL statement.
    fn creates() -> &'static str;
    /// Returns `CREATE INDEX IF NOT EXISTS` statements for all indices.
    fn indices() -> &'static str;
}

/// Applies DDL for every table owned by the platform, in dependency order.
/// Idempotent; safe to run at every process start.
pub async fn migrate(client: &Arc<Client>) -> Result<(), crate::PgErr> {
    log::info!("applying schema migrations");
    client.batch_execute(crate::UserProfile::creates()).await?;
    client.batch_execute(crate::Session::creates()).await?;
    client.batch_execute(crate::Participant::creates()).await?;
    client.batch_execute(crate::Session::indices()).await?;
    client.batch_execute(crate::Participant::indices()).await?;
    Ok(())
}
