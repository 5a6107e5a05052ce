//! SQLite persistence for DiskWarden.
//!
//! Provides the connection pool, embedded migrations, the `disk_state` row
//! model and repository, and [`SqliteStateStore`], the production
//! [`StateStore`](diskwarden_core::store::StateStore).

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

pub mod models;
pub mod repositories;
pub mod store;

pub use store::SqliteStateStore;

pub type DbPool = sqlx::SqlitePool;

/// How long a connection waits on SQLite's own file lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Create a connection pool from a database URL, e.g. `sqlite://diskwarden_state.db`.
///
/// The database file is created if missing and opened in WAL mode so status
/// queries do not block scan writes.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply embedded migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
