//! # Database Pool Management
//!
//! Builds the SQLite pool every repository hangs off.
//!
//! SQLite runs in WAL mode here: POS sessions keep reading the catalog
//! while checkouts write, and the single serialized writer is exactly the
//! property the stock guard's guarded INSERT relies on (see
//! [`crate::repository::stock`]).

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::audit::AuditLogRepository;
use crate::repository::outbox::AnalyticsOutboxRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::stock::StockRepository;
use crate::repository::store::StoreRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("/var/lib/vela/vela.db").max_connections(8)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite file; created on first connect if missing.
    pub database_path: PathBuf,

    /// Pool size cap.
    pub max_connections: u32,

    /// How long to wait for a free connection before giving up.
    pub acquire_timeout: Duration,

    /// Apply pending migrations during [`Database::new`].
    pub run_migrations: bool,
}

impl DbConfig {
    /// Configuration with defaults for the given database file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// Sets the pool size cap.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Enables or disables migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// An isolated in-memory database, for tests.
    ///
    /// In-memory SQLite is per-connection state, so the pool is pinned to
    /// one connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(true)
            // WAL: readers and writers stop blocking each other
            .journal_mode(SqliteJournalMode::Wal)
            // NORMAL is durable enough for a POS and much faster than FULL
            .synchronous(SqliteSynchronous::Normal)
            // off by default in SQLite for backwards compatibility
            .foreign_keys(true)
            // colliding writers wait their turn instead of erroring
            .busy_timeout(Duration::from_secs(5))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the pooled database; cheap to clone, clones share the pool.
///
/// Repositories are handed out per call (`db.stock().reserve(...)`) — each
/// is a thin wrapper over the shared pool, so nothing here needs locking.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (and if necessary creates) the database, then applies pending
    /// migrations unless the config disables them.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            // keep one connection alive; for in-memory databases that
            // connection IS the database
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Pool ready");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// The raw pool, for queries no repository covers. Prefer repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Product catalog repository.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Store directory repository.
    pub fn stores(&self) -> StoreRepository {
        StoreRepository::new(self.pool.clone())
    }

    /// Stock reservation repository.
    pub fn stock(&self) -> StockRepository {
        StockRepository::new(self.pool.clone())
    }

    /// Sale repository.
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    /// Audit log repository.
    pub fn audit(&self) -> AuditLogRepository {
        AuditLogRepository::new(self.pool.clone())
    }

    /// Analytics outbox repository.
    pub fn outbox(&self) -> AnalyticsOutboxRepository {
        AnalyticsOutboxRepository::new(self.pool.clone())
    }

    /// Shuts the pool down (application shutdown).
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// True when the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_comes_up_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let status = migrations::status(db.pool()).await.unwrap();
        assert_eq!(status.applied, status.total);
        assert!(status.total >= 3);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn config_builder() {
        let config = DbConfig::new("/tmp/vela-test.db")
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(3));
        assert!(!config.run_migrations);
    }
}
