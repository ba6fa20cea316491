//! Repository layer: typed operations over the `feeds`/`feed_items` tables
//! (§3, §4.2). Grounded on the teacher's `Database` wrapper (pool +
//! per-domain submodules), adapted from SQLite to Postgres since the spec's
//! env-var surface (`DB_HOST`/`DB_PORT`/...) names a networked RDBMS.

mod feeds;
mod items;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::{DatabaseError, Error, Result};

pub use feeds::UpsertFeedResult;
pub use items::NewItem;

/// Owns the connection pool and exposes every repository operation the
/// pipeline depends on.
#[derive(Clone)]
pub struct Repository {
    pool: PgPool,
}

impl Repository {
    /// Connects to `database_url` with a small pool, matching the
    /// teacher's "assume the repository provides its own connection pool"
    /// contract (§5).
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "failed to connect to {database_url}: {e}"
                )))
            })?;

        Ok(Self { pool })
    }

    /// Wraps an already-established pool (used by tests and by `sqlx::test`-style fixtures).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the embedded migration set. A no-op if `DISABLE_MIGRATE` is set
    /// at the process level (the caller decides whether to call this at all).
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(DatabaseError::MigrationFailed(e.to_string())))?;
        Ok(())
    }

}
