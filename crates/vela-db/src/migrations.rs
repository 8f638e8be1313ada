//! # Database Migrations
//!
//! The SQL files under `migrations/sqlite/` are embedded into the binary by
//! `sqlx::migrate!` and applied in filename order. Applied versions are
//! tracked in `_sqlx_migrations`, so reruns are no-ops.
//!
//! New schema changes get a new `NNN_description.sql` file; shipped
//! migration files are never edited.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies all pending migrations, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    debug!(total = MIGRATOR.migrations.len(), "Migrations up to date");
    Ok(())
}

/// Snapshot of how many migrations exist vs. have been applied.
#[derive(Debug, Clone, Copy)]
pub struct MigrationStatus {
    pub total: usize,
    pub applied: usize,
}

/// Reads the migration bookkeeping table, for health/diagnostic endpoints.
pub async fn status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok(MigrationStatus {
        total: MIGRATOR.migrations.len(),
        applied: applied as usize,
    })
}
