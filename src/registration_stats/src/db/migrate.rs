//! Embedded schema migrations.

use anyhow::anyhow;
use diesel::{Connection, SqliteConnection, connection::SimpleConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

/// Embedded Diesel migrations bundled with this crate.
///
/// These create `vehicle_registrations` with its secondary indexes and the unique
/// natural-key index.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs pending migrations on a SQLite database at the given path.
///
/// Sets the journal mode to WAL first so the file is created in the mode every later
/// connection expects.
pub fn run_sqlite(path: &str) -> anyhow::Result<()> {
    let mut conn = SqliteConnection::establish(path)?;
    conn.batch_execute("PRAGMA journal_mode=WAL;")?;
    run_on(&mut conn)
}

/// Runs pending migrations on an already-open connection.
///
/// Needed for `:memory:` databases, where every connection sees its own empty database.
pub fn run_on(conn: &mut SqliteConnection) -> anyhow::Result<()> {
    let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| anyhow!(e))?;
    if !applied.is_empty() {
        tracing::info!(count = applied.len(), "applied pending migrations");
    }
    Ok(())
}

/// Runs pending migrations for the given database URL.
///
/// Accepts bare paths and `sqlite:` / `sqlite://` URLs; PostgreSQL URLs are rejected.
pub fn run_all(database_url: &str) -> anyhow::Result<()> {
    match super::sqlite_path(database_url) {
        Some(path) => run_sqlite(path),
        None => anyhow::bail!("Unsupported DATABASE_URL: {database_url}"),
    }
}
